//! Per-type binding of revision tracking onto a host.
//!
//! Binding one type walks four stages: the history schema is derived, the
//! history entity is registered with the host, then recorder and guard hooks
//! are attached. A failure before the last stage leaves nothing behind that
//! tracking would use; attaching hooks cannot fail.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rev_config::{RevConfig, TrackingConfig};
use rev_core::author::{AuthorContext, AuthorId};
use rev_core::derive::derive_history_schema;
use rev_core::enums::LifecycleEvent;
use rev_core::predicate::Predicate;
use rev_core::revision::{self, Revision};
use rev_core::schema::EntitySchema;

use crate::error::{ErrorKind, TrackingError};
use crate::host::Host;
use crate::tracking::{Binding, BulkRevisionRecorder, ReadOnlyGuard, RevisionRecorder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindStage {
    Unregistered,
    SchemaDerived,
    Registered,
    HooksAttached,
}

/// Handle to a bound history type.
#[derive(Debug, Clone)]
pub struct HistoryHandle {
    binding: Arc<Binding>,
}

impl HistoryHandle {
    /// Name of the history entity, e.g. `TaskHistory`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.binding.history.name
    }

    #[must_use]
    pub fn schema(&self) -> &EntitySchema {
        &self.binding.history
    }

    #[must_use]
    pub fn tracked(&self) -> &EntitySchema {
        &self.binding.tracked
    }

    #[must_use]
    pub fn config(&self) -> &TrackingConfig {
        &self.binding.config
    }

    /// Set the pending author for the next recorded mutation of the tracked
    /// type.
    pub fn set_author(&self, author: impl Into<AuthorId>) {
        self.binding
            .authors
            .set_author(&self.binding.tracked.name, author);
    }

    #[must_use]
    pub fn recorder(&self) -> RevisionRecorder {
        RevisionRecorder::new(Arc::clone(&self.binding))
    }

    #[must_use]
    pub fn bulk_recorder(&self) -> BulkRevisionRecorder {
        BulkRevisionRecorder::new(Arc::clone(&self.binding))
    }

    /// Revisions of one tracked instance, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` if the query fails or a stored row cannot be
    /// decoded.
    pub async fn revisions(
        &self,
        host: &dyn Host,
        model_id: &serde_json::Value,
    ) -> Result<Vec<Revision>, TrackingError> {
        let predicate = Predicate::all().eq(revision::MODEL_ID, model_id.clone());
        host.find_all(host.connection(), &self.binding.history, &predicate, &[])
            .await?
            .iter()
            .map(|row| {
                Revision::from_record(row, self.binding.author_field()).map_err(TrackingError::from)
            })
            .collect()
    }
}

/// Binds tracked types to history types and owns the shared author register.
#[derive(Debug, Default)]
pub struct RevisionTracker {
    authors: Arc<AuthorContext>,
    bindings: RwLock<BTreeMap<String, HistoryHandle>>,
}

impl RevisionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The author register shared by every binding of this tracker.
    #[must_use]
    pub fn authors(&self) -> Arc<AuthorContext> {
        Arc::clone(&self.authors)
    }

    /// Set the pending author for the next recorded mutation of `tracked`.
    pub fn set_author(&self, tracked: &str, author: impl Into<AuthorId>) {
        self.authors.set_author(tracked, author);
    }

    /// Handle for a bound tracked type.
    #[must_use]
    pub fn handle(&self, tracked: &str) -> Option<HistoryHandle> {
        self.read_bindings().get(tracked).cloned()
    }

    /// Bind revision tracking to the registered entity `tracked`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `Configuration` if the config is invalid,
    /// `tracked` is unknown, already bound or itself a history type, or the
    /// history entity cannot be registered.
    pub async fn bind(
        &self,
        host: &dyn Host,
        tracked: &str,
        config: &TrackingConfig,
    ) -> Result<HistoryHandle, TrackingError> {
        let mut stage = BindStage::Unregistered;
        tracing::debug!(entity = tracked, ?stage, "binding");

        config.validate()?;
        self.ensure_bindable(tracked)?;
        let schema = host
            .entity(tracked)
            .ok_or_else(|| TrackingError::UnknownEntity(tracked.to_string()))?;

        let history = derive_history_schema(&schema, &config.strip, &config.layout())
            .map_err(|e| TrackingError::Configuration(format!("{tracked}: {e}")))?;
        stage = BindStage::SchemaDerived;
        tracing::debug!(entity = tracked, history = %history.name, ?stage, "binding");

        let history = host.define_entity(history).await.map_err(|e| {
            if e.kind() == ErrorKind::Configuration {
                e
            } else {
                TrackingError::Configuration(format!("registering history for {tracked}: {e}"))
            }
        })?;
        stage = BindStage::Registered;
        tracing::debug!(entity = tracked, history = %history.name, ?stage, "binding");

        let binding = Arc::new(Binding {
            tracked: schema,
            history,
            config: config.clone(),
            authors: Arc::clone(&self.authors),
        });
        let handle = HistoryHandle { binding };
        attach_hooks(host, &handle);
        stage = BindStage::HooksAttached;

        self.write_bindings()
            .insert(tracked.to_string(), handle.clone());
        tracing::info!(entity = tracked, history = %handle.name(), ?stage, "revision tracking bound");
        Ok(handle)
    }

    /// Bind every entity registered with `host`, each with its resolved
    /// config. A failing type is logged and skipped.
    ///
    /// Returns every bound history type by name, including ones bound
    /// earlier.
    pub async fn bind_all(
        &self,
        host: &dyn Host,
        config: &RevConfig,
    ) -> BTreeMap<String, HistoryHandle> {
        let history_names: BTreeSet<String> = self
            .read_bindings()
            .values()
            .map(|h| h.name().to_string())
            .collect();

        let mut bound = BTreeMap::new();
        for name in host.entity_names() {
            if history_names.contains(&name) {
                continue;
            }
            if let Some(existing) = self.handle(&name) {
                bound.insert(existing.name().to_string(), existing);
                continue;
            }
            match self.bind(host, &name, &config.tracking_for(&name)).await {
                Ok(handle) => {
                    bound.insert(handle.name().to_string(), handle);
                }
                Err(e) => tracing::warn!(entity = %name, error = %e, "skipping entity"),
            }
        }
        bound
    }

    fn ensure_bindable(&self, tracked: &str) -> Result<(), TrackingError> {
        let bindings = self.read_bindings();
        if bindings.contains_key(tracked) {
            return Err(TrackingError::Configuration(format!(
                "{tracked} is already tracked"
            )));
        }
        if bindings.values().any(|h| h.name() == tracked) {
            return Err(TrackingError::Configuration(format!(
                "{tracked} is a history type"
            )));
        }
        Ok(())
    }

    fn read_bindings(&self) -> RwLockReadGuard<'_, BTreeMap<String, HistoryHandle>> {
        self.bindings
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_bindings(&self) -> RwLockWriteGuard<'_, BTreeMap<String, HistoryHandle>> {
        self.bindings
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn attach_hooks(host: &dyn Host, handle: &HistoryHandle) {
    let tracked = &handle.tracked().name;
    let recorder = Arc::new(handle.recorder());
    let bulk = Arc::new(handle.bulk_recorder());

    host.add_hook(tracked, LifecycleEvent::PreUpdate, recorder.clone());
    host.add_hook(tracked, LifecycleEvent::PreDestroy, recorder);
    host.add_hook(tracked, LifecycleEvent::PreBulkUpdate, bulk.clone());
    host.add_hook(tracked, LifecycleEvent::PreBulkDestroy, bulk);

    for event in LifecycleEvent::ALL {
        host.add_hook(handle.name(), event, Arc::new(ReadOnlyGuard));
    }
}
