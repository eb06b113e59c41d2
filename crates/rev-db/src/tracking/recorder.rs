use std::sync::Arc;

use async_trait::async_trait;
use rev_core::diff::diff;
use rev_core::enums::LifecycleEvent;
use rev_core::revision::{self, Revision};

use crate::error::TrackingError;
use crate::host::{HookPayload, Host, InstanceMutation, MutationHook};
use crate::tracking::Binding;

/// Records the sparse diff of a single-instance update or destroy.
#[derive(Debug, Clone)]
pub struct RevisionRecorder {
    binding: Arc<Binding>,
}

impl RevisionRecorder {
    #[must_use]
    pub const fn new(binding: Arc<Binding>) -> Self {
        Self { binding }
    }

    /// Write one revision for `mutation` inside `tx` and return it as stored.
    ///
    /// # Errors
    ///
    /// Propagates any `TrackingError` from the history insert; the caller's
    /// mutation must fail with it.
    pub async fn record(
        &self,
        mutation: &InstanceMutation<'_>,
        tx: &libsql::Connection,
        host: &dyn Host,
    ) -> Result<Revision, TrackingError> {
        let binding = &self.binding;
        let identity = &binding.tracked.identity;

        let mut changes = diff(mutation.previous, mutation.current, &binding.config.exclude);
        changes.remove(identity);
        changes.remove(revision::ID);

        let model_id = mutation
            .current
            .get(identity)
            .or_else(|| mutation.previous.get(identity))
            .filter(|v| !v.is_null())
            .cloned();
        let author = binding.resolve_author(mutation.author);

        let pending = Revision::new(model_id, changes, author);
        let row = pending.to_record(binding.author_field())?;
        let stored = host.insert(tx, &binding.history, &row).await?;
        let saved = Revision::from_record(&stored, binding.author_field())?;

        tracing::debug!(
            entity = %binding.tracked.name,
            revision = ?saved.id,
            changed = saved.diff.len(),
            "revision recorded"
        );
        Ok(saved)
    }
}

#[async_trait]
impl MutationHook for RevisionRecorder {
    async fn on_event(
        &self,
        _event: LifecycleEvent,
        payload: &HookPayload<'_>,
        tx: &libsql::Connection,
        host: &dyn Host,
    ) -> Result<(), TrackingError> {
        match payload {
            HookPayload::Instance(mutation) => self.record(mutation, tx, host).await.map(|_| ()),
            HookPayload::Bulk(_) => Ok(()),
        }
    }
}
