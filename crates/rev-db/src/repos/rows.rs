//! Row-level insert and select for any registered entity.

use rev_core::Record;
use rev_core::predicate::Predicate;
use rev_core::schema::{AttributeDef, EntitySchema};

use crate::error::TrackingError;
use crate::helpers::{
    attribute, quote_ident, resolve_attributes, row_to_record, to_sql_value, where_clause,
};
use crate::service::LibsqlHost;

fn column_list(attributes: &[&AttributeDef]) -> String {
    attributes
        .iter()
        .map(|a| quote_ident(&a.field))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attribute definitions for the keys of `rows`, in schema order.
fn written_attributes<'a>(
    entity: &'a EntitySchema,
    rows: &[Record],
) -> Result<Vec<&'a AttributeDef>, TrackingError> {
    for key in rows.iter().flat_map(|r| r.keys()) {
        attribute(entity, key)?;
    }
    Ok(entity
        .attributes
        .iter()
        .filter(|a| rows.iter().any(|r| r.contains_key(&a.name)))
        .collect())
}

/// SQLite's default cap on bound parameters per statement.
pub const MAX_BOUND_PARAMS: usize = 32_766;

/// Rows that fit in one `INSERT` writing `columns` values per row.
#[must_use]
pub const fn rows_per_statement(columns: usize) -> usize {
    if columns == 0 {
        return 1;
    }
    let rows = MAX_BOUND_PARAMS / columns;
    if rows == 0 { 1 } else { rows }
}

fn identity_order(entity: &EntitySchema, a: &Record, b: &Record) -> std::cmp::Ordering {
    let key = |r: &Record| r.get(&entity.identity).and_then(serde_json::Value::as_i64);
    key(a).cmp(&key(b))
}

impl LibsqlHost {
    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Configuration` for unknown attributes and
    /// `TrackingError::LibSql` if the statement fails.
    pub async fn insert_row(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        row: &Record,
    ) -> Result<Record, TrackingError> {
        let mut stored = self.insert_rows(tx, entity, std::slice::from_ref(row)).await?;
        stored.pop().ok_or_else(|| {
            TrackingError::Persistence(format!("insert into {} returned no row", entity.table))
        })
    }

    /// Insert rows with multi-row `INSERT ... RETURNING` statements on `tx`.
    ///
    /// The column list is the union of the rows' keys; a row lacking a key
    /// binds `NULL` for it. Rows are split across statements so no statement
    /// binds more than [`MAX_BOUND_PARAMS`] values.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Configuration` for unknown attributes and
    /// `TrackingError::LibSql` if a statement fails.
    pub async fn insert_rows(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        rows: &[Record],
    ) -> Result<Vec<Record>, TrackingError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let written = written_attributes(entity, rows)?;
        let all: Vec<&AttributeDef> = entity.attributes.iter().collect();
        let returning = column_list(&all);

        if written.is_empty() {
            if rows.len() > 1 {
                return Err(TrackingError::Configuration(format!(
                    "cannot batch-insert {} empty rows into {}",
                    rows.len(),
                    entity.table
                )));
            }
            let sql = format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {returning}",
                quote_ident(&entity.table)
            );
            return self.run_insert(tx, entity, &sql, Vec::new(), 1, &all).await;
        }

        let mut stored = Vec::with_capacity(rows.len());
        for chunk in rows.chunks(rows_per_statement(written.len())) {
            let mut params: Vec<libsql::Value> = Vec::with_capacity(chunk.len() * written.len());
            let mut tuples = Vec::with_capacity(chunk.len());
            for row in chunk {
                let mut slots = Vec::with_capacity(written.len());
                for attr in &written {
                    let value = row.get(&attr.name).unwrap_or(&serde_json::Value::Null);
                    params.push(to_sql_value(value, attr.column_type)?);
                    slots.push(format!("?{}", params.len()));
                }
                tuples.push(format!("({})", slots.join(", ")));
            }
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {} RETURNING {returning}",
                quote_ident(&entity.table),
                column_list(&written),
                tuples.join(", ")
            );
            stored.extend(
                self.run_insert(tx, entity, &sql, params, chunk.len(), &all)
                    .await?,
            );
        }

        // RETURNING order is unspecified; restore insertion order.
        stored.sort_by(|a, b| identity_order(entity, a, b));
        Ok(stored)
    }

    async fn run_insert(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        sql: &str,
        params: Vec<libsql::Value>,
        expected: usize,
        all: &[&AttributeDef],
    ) -> Result<Vec<Record>, TrackingError> {
        let mut result = tx.query(sql, libsql::params_from_iter(params)).await?;
        let mut stored = Vec::with_capacity(expected);
        while let Some(row) = result.next().await? {
            stored.push(row_to_record(&row, all)?);
        }
        if stored.len() != expected {
            return Err(TrackingError::Persistence(format!(
                "inserted {expected} rows into {} but {} came back",
                entity.table,
                stored.len()
            )));
        }
        Ok(stored)
    }

    /// Select rows matching `predicate`, restricted to `attributes` (every
    /// attribute when empty), ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Configuration` for unknown attributes and
    /// `TrackingError::LibSql` if the query fails.
    pub async fn select_rows(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        predicate: &Predicate,
        attributes: &[String],
    ) -> Result<Vec<Record>, TrackingError> {
        let selected = resolve_attributes(entity, attributes)?;
        let identity = attribute(entity, &entity.identity)?;

        let mut params = Vec::new();
        let filter = where_clause(entity, predicate, &mut params)?;
        let sql = format!(
            "SELECT {} FROM {} {filter} ORDER BY {} ASC",
            column_list(&selected),
            quote_ident(&entity.table),
            quote_ident(&identity.field)
        );

        let mut rows = tx.query(&sql, libsql::params_from_iter(params)).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row, &selected)?);
        }
        Ok(records)
    }

    /// Select one row by identity.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::NotFound` if no row has this identity.
    pub async fn select_one(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        id: &serde_json::Value,
    ) -> Result<Record, TrackingError> {
        let predicate = Predicate::all().eq(entity.identity.clone(), id.clone());
        self.select_rows(tx, entity, &predicate, &[])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TrackingError::NotFound {
                entity: entity.name.clone(),
                id: id.to_string(),
            })
    }
}
