use async_trait::async_trait;
use rev_core::enums::LifecycleEvent;

use crate::error::TrackingError;
use crate::host::{HookPayload, Host, MutationHook};

/// Attached to every mutation event of a history type. Always fails, so no
/// history record is ever changed or removed through the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyGuard;

#[async_trait]
impl MutationHook for ReadOnlyGuard {
    async fn on_event(
        &self,
        event: LifecycleEvent,
        payload: &HookPayload<'_>,
        _tx: &libsql::Connection,
        _host: &dyn Host,
    ) -> Result<(), TrackingError> {
        Err(TrackingError::ImmutabilityViolation {
            entity: payload.entity().name.clone(),
            event,
        })
    }
}
