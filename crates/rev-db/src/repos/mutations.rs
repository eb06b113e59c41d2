//! Hook-firing mutations: create, update, destroy, bulk update, bulk destroy.
//!
//! Each mutation has an `_in` form that joins the caller's transaction and a
//! committed form that opens its own and rolls it back on any error.

use rev_core::Record;
use rev_core::enums::LifecycleEvent;
use rev_core::predicate::Predicate;
use rev_core::schema::EntitySchema;
use serde_json::Value;

use crate::error::TrackingError;
use crate::helpers::{attribute, normalize, quote_ident, to_sql_value, where_clause};
use crate::host::{BulkMutation, HookPayload, InstanceMutation, MutationContext};
use crate::service::LibsqlHost;
use crate::updates::bulk::BulkOptions;

/// Commit on success; roll back and keep the original error on failure.
async fn finish<T>(
    tx: libsql::Transaction,
    result: Result<T, TrackingError>,
) -> Result<T, TrackingError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback after failed mutation failed");
            }
            Err(e)
        }
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn check_keys(entity: &EntitySchema, keys: impl IntoIterator<Item = impl AsRef<str>>) -> Result<(), TrackingError> {
    for key in keys {
        attribute(entity, key.as_ref())?;
    }
    Ok(())
}

fn reject_identity(entity: &EntitySchema, changes: &Record) -> Result<(), TrackingError> {
    if changes.contains_key(&entity.identity) {
        return Err(TrackingError::Configuration(format!(
            "identity '{}' of {} cannot be updated",
            entity.identity, entity.name
        )));
    }
    Ok(())
}

impl LibsqlHost {
    /// Insert a row without firing hooks. Creation is never recorded.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::UnknownEntity` for an unregistered entity.
    pub async fn create(&self, entity: &str, row: &Record) -> Result<Record, TrackingError> {
        let schema = self.schema(entity)?;
        self.insert_row(self.db().conn(), &schema, row).await
    }

    /// # Errors
    ///
    /// Returns `TrackingError::NotFound` if no row has identity `id`.
    pub async fn find(&self, entity: &str, id: &Value) -> Result<Record, TrackingError> {
        let schema = self.schema(entity)?;
        self.select_one(self.db().conn(), &schema, id).await
    }

    /// # Errors
    ///
    /// Returns `TrackingError` for unknown entities or attributes.
    pub async fn find_where(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, TrackingError> {
        let schema = self.schema(entity)?;
        self.select_rows(self.db().conn(), &schema, predicate, &[]).await
    }

    /// Update one row in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns the first hook error, or `TrackingError` if the row is
    /// missing or the statement fails. Nothing is committed on error.
    pub async fn update(
        &self,
        entity: &str,
        id: &Value,
        changes: &Record,
        ctx: &MutationContext,
    ) -> Result<Record, TrackingError> {
        let tx = self.transaction().await?;
        let result = self.update_in(&tx, entity, id, changes, ctx).await;
        finish(tx, result).await
    }

    /// Update one row inside `tx`, firing `pre_update` hooks first.
    ///
    /// `changes` may repeat the current identity value; changing it is
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns the first hook error, or `TrackingError` if the row is
    /// missing or the statement fails.
    pub async fn update_in(
        &self,
        tx: &libsql::Connection,
        entity: &str,
        id: &Value,
        changes: &Record,
        ctx: &MutationContext,
    ) -> Result<Record, TrackingError> {
        let schema = self.schema(entity)?;
        check_keys(&schema, changes.keys())?;

        let mut writes = changes.clone();
        if writes.get(&schema.identity).is_some_and(|v| v == id) {
            writes.remove(&schema.identity);
        }
        reject_identity(&schema, &writes)?;
        for (key, value) in &mut writes {
            *value = normalize(value, attribute(&schema, key)?.column_type)?;
        }

        let previous = self.select_one(tx, &schema, id).await?;
        let mut current = previous.clone();
        current.extend(writes.clone());

        let payload = HookPayload::Instance(InstanceMutation {
            entity: &schema,
            previous: &previous,
            current: &current,
            author: ctx.author.as_ref(),
        });
        self.run_hooks(tx, LifecycleEvent::PreUpdate, &payload).await?;

        let by_id = Predicate::all().eq(schema.identity.clone(), id.clone());
        self.write_update(tx, &schema, &by_id, &writes).await?;
        self.select_one(tx, &schema, id).await
    }

    /// Destroy one row in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns the first hook error, or `TrackingError` if the row is
    /// missing or the statement fails. Nothing is committed on error.
    pub async fn destroy(
        &self,
        entity: &str,
        id: &Value,
        ctx: &MutationContext,
    ) -> Result<Record, TrackingError> {
        let tx = self.transaction().await?;
        let result = self.destroy_in(&tx, entity, id, ctx).await;
        finish(tx, result).await
    }

    /// Destroy one row inside `tx`, firing `pre_destroy` hooks first.
    /// Hooks see the stored row as both prior and current state.
    ///
    /// Returns the row as it was before deletion.
    ///
    /// # Errors
    ///
    /// Returns the first hook error, or `TrackingError` if the row is
    /// missing or the statement fails.
    pub async fn destroy_in(
        &self,
        tx: &libsql::Connection,
        entity: &str,
        id: &Value,
        ctx: &MutationContext,
    ) -> Result<Record, TrackingError> {
        let schema = self.schema(entity)?;
        let previous = self.select_one(tx, &schema, id).await?;

        let payload = HookPayload::Instance(InstanceMutation {
            entity: &schema,
            previous: &previous,
            current: &previous,
            author: ctx.author.as_ref(),
        });
        self.run_hooks(tx, LifecycleEvent::PreDestroy, &payload).await?;

        let by_id = Predicate::all().eq(schema.identity.clone(), id.clone());
        self.write_delete(tx, &schema, &by_id).await?;
        Ok(previous)
    }

    /// Bulk update in its own transaction. Returns the number of rows
    /// affected.
    ///
    /// # Errors
    ///
    /// Returns the first hook error or a `TrackingError` from the store.
    /// Nothing is committed on error.
    pub async fn bulk_update(
        &self,
        entity: &str,
        options: &BulkOptions,
    ) -> Result<u64, TrackingError> {
        let tx = self.transaction().await?;
        let result = self.bulk_update_in(&tx, entity, options).await;
        finish(tx, result).await
    }

    /// Bulk update inside `tx`.
    ///
    /// Fires `pre_bulk_update` hooks, then either issues one `UPDATE` for
    /// the declared fields or, with `individual_hooks`, updates each
    /// matching row through [`Self::update_in`].
    ///
    /// # Errors
    ///
    /// Returns the first hook error or a `TrackingError` from the store.
    pub async fn bulk_update_in(
        &self,
        tx: &libsql::Connection,
        entity: &str,
        options: &BulkOptions,
    ) -> Result<u64, TrackingError> {
        let schema = self.schema(entity)?;
        check_keys(&schema, &options.fields)?;
        check_keys(&schema, options.values.keys())?;

        let changes: Record = options
            .values
            .iter()
            .filter(|(key, _)| options.fields.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        reject_identity(&schema, &changes)?;

        let payload = HookPayload::Bulk(BulkMutation {
            entity: &schema,
            predicate: &options.predicate,
            fields: &options.fields,
            values: &options.values,
            individual_hooks: options.individual_hooks,
            author: options.author.as_ref(),
        });
        self.run_hooks(tx, LifecycleEvent::PreBulkUpdate, &payload).await?;

        if options.individual_hooks {
            let ctx = MutationContext {
                author: options.author.clone(),
            };
            let ids = self.matching_ids(tx, &schema, &options.predicate).await?;
            for id in &ids {
                self.update_in(tx, entity, id, &changes, &ctx).await?;
            }
            return Ok(count(ids.len()));
        }

        self.write_update(tx, &schema, &options.predicate, &changes).await
    }

    /// Bulk destroy in its own transaction. Returns the number of rows
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns the first hook error or a `TrackingError` from the store.
    /// Nothing is committed on error.
    pub async fn bulk_destroy(
        &self,
        entity: &str,
        options: &BulkOptions,
    ) -> Result<u64, TrackingError> {
        let tx = self.transaction().await?;
        let result = self.bulk_destroy_in(&tx, entity, options).await;
        finish(tx, result).await
    }

    /// Bulk destroy inside `tx`. Hooks see no declared fields; `values` and
    /// `fields` of `options` are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first hook error or a `TrackingError` from the store.
    pub async fn bulk_destroy_in(
        &self,
        tx: &libsql::Connection,
        entity: &str,
        options: &BulkOptions,
    ) -> Result<u64, TrackingError> {
        let schema = self.schema(entity)?;
        let no_values = Record::new();

        let payload = HookPayload::Bulk(BulkMutation {
            entity: &schema,
            predicate: &options.predicate,
            fields: &[],
            values: &no_values,
            individual_hooks: options.individual_hooks,
            author: options.author.as_ref(),
        });
        self.run_hooks(tx, LifecycleEvent::PreBulkDestroy, &payload).await?;

        if options.individual_hooks {
            let ctx = MutationContext {
                author: options.author.clone(),
            };
            let ids = self.matching_ids(tx, &schema, &options.predicate).await?;
            for id in &ids {
                self.destroy_in(tx, entity, id, &ctx).await?;
            }
            return Ok(count(ids.len()));
        }

        self.write_delete(tx, &schema, &options.predicate).await
    }

    async fn matching_ids(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        predicate: &Predicate,
    ) -> Result<Vec<Value>, TrackingError> {
        let rows = self
            .select_rows(tx, entity, predicate, std::slice::from_ref(&entity.identity))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.remove(&entity.identity))
            .collect())
    }

    async fn write_update(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<u64, TrackingError> {
        if changes.is_empty() {
            return Ok(count(self.matching_ids(tx, entity, predicate).await?.len()));
        }

        let mut params: Vec<libsql::Value> = Vec::with_capacity(changes.len());
        let mut sets = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            let attr = attribute(entity, key)?;
            params.push(to_sql_value(value, attr.column_type)?);
            sets.push(format!("{} = ?{}", quote_ident(&attr.field), params.len()));
        }
        let filter = where_clause(entity, predicate, &mut params)?;

        let sql = format!(
            "UPDATE {} SET {} {filter}",
            quote_ident(&entity.table),
            sets.join(", ")
        );
        Ok(tx.execute(&sql, libsql::params_from_iter(params)).await?)
    }

    async fn write_delete(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, TrackingError> {
        let mut params = Vec::new();
        let filter = where_clause(entity, predicate, &mut params)?;
        let sql = format!("DELETE FROM {} {filter}", quote_ident(&entity.table));
        Ok(tx.execute(&sql, libsql::params_from_iter(params)).await?)
    }
}
