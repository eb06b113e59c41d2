use std::sync::Arc;

use async_trait::async_trait;
use rev_core::Record;
use rev_core::diff::declared_fields;
use rev_core::enums::LifecycleEvent;
use rev_core::revision::Revision;

use crate::error::TrackingError;
use crate::host::{BulkMutation, HookPayload, Host, MutationHook};
use crate::tracking::Binding;

/// Records one revision per row matched by a bulk update or destroy.
///
/// Rows are read before the mutation applies. Every declared field is
/// reported with its stored value, whether or not the mutation changes it.
#[derive(Debug, Clone)]
pub struct BulkRevisionRecorder {
    binding: Arc<Binding>,
}

impl BulkRevisionRecorder {
    #[must_use]
    pub const fn new(binding: Arc<Binding>) -> Self {
        Self { binding }
    }

    /// Write one revision per matching row in a single batched insert.
    ///
    /// Returns nothing when the host will expand the mutation into
    /// individual ones, since the single-instance recorder covers those.
    ///
    /// # Errors
    ///
    /// Propagates any `TrackingError` from the snapshot query or the insert.
    pub async fn record(
        &self,
        mutation: &BulkMutation<'_>,
        tx: &libsql::Connection,
        host: &dyn Host,
    ) -> Result<Vec<Revision>, TrackingError> {
        if mutation.individual_hooks {
            return Ok(Vec::new());
        }

        let binding = &self.binding;
        let identity = &binding.tracked.identity;
        let exclude = &binding.config.exclude;

        let fields: Vec<String> = mutation
            .fields
            .iter()
            .filter(|f| *f != identity && !exclude.contains(f.as_str()))
            .cloned()
            .collect();
        let mut selected = Vec::with_capacity(fields.len() + 1);
        selected.push(identity.clone());
        selected.extend(fields.iter().cloned());

        let rows = host
            .find_all(tx, &binding.tracked, mutation.predicate, &selected)
            .await?;

        // One author for the whole batch; cleared once the batch is stored.
        let author = if binding.config.tracks_author() {
            mutation
                .author
                .cloned()
                .or_else(|| binding.authors.peek_author(&binding.tracked.name))
        } else {
            None
        };

        let pending = rows
            .iter()
            .map(|row| {
                let model_id = row.get(identity).filter(|v| !v.is_null()).cloned();
                Revision::new(model_id, declared_fields(row, &fields, exclude), author.clone())
                    .to_record(binding.author_field())
            })
            .collect::<Result<Vec<Record>, _>>()?;

        let stored = host.insert_many(tx, &binding.history, &pending).await?;
        if binding.config.tracks_author() {
            binding.authors.take_author(&binding.tracked.name);
        }

        let revisions = stored
            .iter()
            .map(|row| Revision::from_record(row, binding.author_field()))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            entity = %binding.tracked.name,
            rows = revisions.len(),
            "bulk revisions recorded"
        );
        Ok(revisions)
    }
}

#[async_trait]
impl MutationHook for BulkRevisionRecorder {
    async fn on_event(
        &self,
        _event: LifecycleEvent,
        payload: &HookPayload<'_>,
        tx: &libsql::Connection,
        host: &dyn Host,
    ) -> Result<(), TrackingError> {
        match payload {
            HookPayload::Bulk(mutation) => self.record(mutation, tx, host).await.map(|_| ()),
            HookPayload::Instance(_) => Ok(()),
        }
    }
}
