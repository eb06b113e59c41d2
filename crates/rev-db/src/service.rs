//! libSQL-backed persistence host.
//!
//! `LibsqlHost` wraps `RevDb` with an entity registry and a hook table.
//! Mutation methods live in `repos::mutations` and follow this protocol:
//! 1. Begin transaction (or join the caller's)
//! 2. Load the affected state
//! 3. Run every pre-mutation hook for the entity, in attachment order
//! 4. Execute the SQL
//! 5. Commit (or roll back if any step failed)

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rev_core::Record;
use rev_core::enums::LifecycleEvent;
use rev_core::predicate::Predicate;
use rev_core::schema::EntitySchema;

use crate::RevDb;
use crate::ddl;
use crate::error::TrackingError;
use crate::host::{HookPayload, Host, MutationHook};

type HookTable = HashMap<(String, LifecycleEvent), Vec<Arc<dyn MutationHook>>>;

pub struct LibsqlHost {
    db: RevDb,
    entities: RwLock<BTreeMap<String, Arc<EntitySchema>>>,
    hooks: RwLock<HookTable>,
}

impl LibsqlHost {
    /// Open a host over a local database file, or `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, TrackingError> {
        Ok(Self::from_db(RevDb::open_local(path).await?))
    }

    #[must_use]
    pub fn from_db(db: RevDb) -> Self {
        Self {
            db,
            entities: RwLock::new(BTreeMap::new()),
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &RevDb {
        &self.db
    }

    /// Begin a transaction that `*_in` mutation methods can join.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if `BEGIN` fails.
    pub async fn transaction(&self) -> Result<libsql::Transaction, TrackingError> {
        self.db.transaction().await
    }

    /// Look up a registered entity.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::UnknownEntity` if `name` is not registered.
    pub fn schema(&self, name: &str) -> Result<Arc<EntitySchema>, TrackingError> {
        self.entity(name)
            .ok_or_else(|| TrackingError::UnknownEntity(name.to_string()))
    }

    /// Number of hooks attached to `event` on `entity`.
    #[must_use]
    pub fn hook_count(&self, entity: &str, event: LifecycleEvent) -> usize {
        self.read_hooks()
            .get(&(entity.to_string(), event))
            .map_or(0, Vec::len)
    }

    /// Run the hooks for `event` on the payload's entity, stopping at the
    /// first error.
    pub(crate) async fn run_hooks(
        &self,
        tx: &libsql::Connection,
        event: LifecycleEvent,
        payload: &HookPayload<'_>,
    ) -> Result<(), TrackingError> {
        // Clone out of the lock: hooks await, guards must not be held.
        let hooks = self
            .read_hooks()
            .get(&(payload.entity().name.clone(), event))
            .cloned()
            .unwrap_or_default();

        for hook in hooks {
            hook.on_event(event, payload, tx, self).await?;
        }
        Ok(())
    }

    fn read_entities(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<EntitySchema>>> {
        self.entities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_entities(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<EntitySchema>>> {
        self.entities
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read_hooks(&self) -> RwLockReadGuard<'_, HookTable> {
        self.hooks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn collision(&self, schema: &EntitySchema) -> Option<String> {
        let entities = self.read_entities();
        if entities.contains_key(&schema.name) {
            return Some(schema.name.clone());
        }
        entities
            .values()
            .find(|e| e.table == schema.table)
            .map(|e| format!("{} (table {})", e.name, e.table))
    }
}

#[async_trait]
impl Host for LibsqlHost {
    fn connection(&self) -> &libsql::Connection {
        self.db.conn()
    }

    fn entity(&self, name: &str) -> Option<Arc<EntitySchema>> {
        self.read_entities().get(name).cloned()
    }

    fn entity_names(&self) -> Vec<String> {
        self.read_entities().keys().cloned().collect()
    }

    async fn define_entity(
        &self,
        schema: EntitySchema,
    ) -> Result<Arc<EntitySchema>, TrackingError> {
        schema.validate()?;
        if let Some(existing) = self.collision(&schema) {
            return Err(TrackingError::NameCollision(existing));
        }

        self.db.conn().execute(&ddl::create_table(&schema), ()).await?;

        let schema = Arc::new(schema);
        let mut entities = self.write_entities();
        // Another define may have won while the table was being created.
        if entities.contains_key(&schema.name) {
            return Err(TrackingError::NameCollision(schema.name.clone()));
        }
        entities.insert(schema.name.clone(), Arc::clone(&schema));
        tracing::debug!(entity = %schema.name, table = %schema.table, "entity defined");
        Ok(schema)
    }

    fn add_hook(&self, entity: &str, event: LifecycleEvent, hook: Arc<dyn MutationHook>) {
        self.hooks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry((entity.to_string(), event))
            .or_default()
            .push(hook);
    }

    async fn insert(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        row: &Record,
    ) -> Result<Record, TrackingError> {
        self.insert_row(tx, entity, row).await
    }

    async fn insert_many(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        rows: &[Record],
    ) -> Result<Vec<Record>, TrackingError> {
        self.insert_rows(tx, entity, rows).await
    }

    async fn find_all(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        predicate: &Predicate,
        attributes: &[String],
    ) -> Result<Vec<Record>, TrackingError> {
        self.select_rows(tx, entity, predicate, attributes).await
    }
}
