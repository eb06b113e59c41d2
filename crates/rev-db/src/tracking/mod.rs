//! Revision tracking wired onto a [`Host`](crate::host::Host).
//!
//! - [`RevisionRecorder`]: one revision per single-instance update or destroy
//! - [`BulkRevisionRecorder`]: one revision per row matched by a bulk mutation
//! - [`ReadOnlyGuard`]: rejects every mutation of a history record
//! - [`RevisionTracker`]: derives history types and attaches the hooks above

mod bulk_recorder;
mod guard;
mod recorder;
mod tracker;

use std::sync::Arc;

use rev_config::TrackingConfig;
use rev_core::author::{AuthorContext, AuthorId};
use rev_core::schema::EntitySchema;

pub use bulk_recorder::BulkRevisionRecorder;
pub use guard::ReadOnlyGuard;
pub use recorder::RevisionRecorder;
pub use tracker::{HistoryHandle, RevisionTracker};

/// Everything a recorder needs about one tracked type.
#[derive(Debug)]
pub struct Binding {
    pub tracked: Arc<EntitySchema>,
    pub history: Arc<EntitySchema>,
    pub config: TrackingConfig,
    pub authors: Arc<AuthorContext>,
}

impl Binding {
    #[must_use]
    pub fn author_field(&self) -> Option<&str> {
        self.config.author_field.as_deref()
    }

    /// Author for one recorded mutation.
    ///
    /// Consumes the pending author exactly once; an explicit author wins over
    /// it. The register is left alone when author tracking is off.
    #[must_use]
    pub fn resolve_author(&self, explicit: Option<&AuthorId>) -> Option<AuthorId> {
        if !self.config.tracks_author() {
            return None;
        }
        let pending = self.authors.take_author(&self.tracked.name);
        explicit.cloned().or(pending)
    }
}
