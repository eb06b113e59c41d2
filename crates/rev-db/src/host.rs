//! The persistence host contract.
//!
//! A host owns entity schemas and their tables, and fires pre-mutation
//! hooks. Revision tracking only needs what is declared here: registering a
//! derived entity, attaching hooks for the fixed [`LifecycleEvent`] set, and
//! transaction-aware insert and lookup.
//!
//! The transaction handle passed around is the `libsql::Connection` running
//! the active transaction; statements issued on it join that transaction.

use std::sync::Arc;

use async_trait::async_trait;
use rev_core::Record;
use rev_core::author::AuthorId;
use rev_core::enums::LifecycleEvent;
use rev_core::predicate::Predicate;
use rev_core::schema::EntitySchema;

use crate::error::TrackingError;

/// Per-call options for a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationContext {
    /// Author of this mutation. Takes precedence over a pending author set
    /// through the tracker.
    pub author: Option<AuthorId>,
}

impl MutationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn by(author: impl Into<AuthorId>) -> Self {
        Self {
            author: Some(author.into()),
        }
    }
}

/// A mutation of one instance, seen before it is applied.
#[derive(Debug, Clone, Copy)]
pub struct InstanceMutation<'a> {
    pub entity: &'a EntitySchema,
    /// Stored state before the mutation.
    pub previous: &'a Record,
    /// State the mutation will write. Equal to `previous` for a destroy.
    pub current: &'a Record,
    pub author: Option<&'a AuthorId>,
}

/// A predicate-driven mutation, seen before it is applied.
#[derive(Debug, Clone, Copy)]
pub struct BulkMutation<'a> {
    pub entity: &'a EntitySchema,
    pub predicate: &'a Predicate,
    /// Attributes the caller declared as updated. Empty for a destroy.
    pub fields: &'a [String],
    pub values: &'a Record,
    /// The host will expand this mutation into per-instance mutations, each
    /// firing its own single-instance hooks.
    pub individual_hooks: bool,
    pub author: Option<&'a AuthorId>,
}

#[derive(Debug, Clone, Copy)]
pub enum HookPayload<'a> {
    Instance(InstanceMutation<'a>),
    Bulk(BulkMutation<'a>),
}

impl HookPayload<'_> {
    #[must_use]
    pub const fn entity(&self) -> &EntitySchema {
        match self {
            Self::Instance(m) => m.entity,
            Self::Bulk(m) => m.entity,
        }
    }
}

/// Reaction to a lifecycle event. Returning an error aborts the mutation.
#[async_trait]
pub trait MutationHook: Send + Sync {
    async fn on_event(
        &self,
        event: LifecycleEvent,
        payload: &HookPayload<'_>,
        tx: &libsql::Connection,
        host: &dyn Host,
    ) -> Result<(), TrackingError>;
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Connection used for reads outside a caller's transaction.
    fn connection(&self) -> &libsql::Connection;

    fn entity(&self, name: &str) -> Option<Arc<EntitySchema>>;

    fn entity_names(&self) -> Vec<String>;

    /// Register a new entity and create its table.
    ///
    /// Fails with `TrackingError::NameCollision` if the name or table is
    /// already registered.
    async fn define_entity(&self, schema: EntitySchema)
    -> Result<Arc<EntitySchema>, TrackingError>;

    /// Attach `hook` to `event` on `entity`. Hooks run in attachment order.
    fn add_hook(&self, entity: &str, event: LifecycleEvent, hook: Arc<dyn MutationHook>);

    /// Insert one row and return it as stored (generated keys included).
    async fn insert(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        row: &Record,
    ) -> Result<Record, TrackingError>;

    /// Insert many rows in one statement and return them as stored, in
    /// identity order.
    async fn insert_many(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        rows: &[Record],
    ) -> Result<Vec<Record>, TrackingError>;

    /// Rows matching `predicate`, restricted to `attributes` (all when
    /// empty), in identity order.
    async fn find_all(
        &self,
        tx: &libsql::Connection,
        entity: &EntitySchema,
        predicate: &Predicate,
        attributes: &[String],
    ) -> Result<Vec<Record>, TrackingError>;
}
