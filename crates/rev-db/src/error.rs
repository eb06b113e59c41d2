//! Error types for rev-db.

use rev_core::enums::LifecycleEvent;
use rev_core::errors::CoreError;
use thiserror::Error;

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad schema or binding setup. Fatal to one type's binding.
    Configuration,
    /// A mutation was attempted on a history record.
    Immutability,
    /// The store failed to read or write.
    Persistence,
}

/// Errors from tracking setup, hooks, and store operations.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Tracking could not be set up for a type.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An entity with this name is already registered with the host.
    #[error("Entity '{0}' is already registered")]
    NameCollision(String),

    /// No entity with this name is registered with the host.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// History records are append-only.
    #[error("Immutable record: {entity} rejects {event}")]
    ImmutabilityViolation {
        entity: String,
        event: LifecycleEvent,
    },

    /// Expected a row but none matched.
    #[error("No {entity} row with identity {id}")]
    NotFound { entity: String, id: String },

    /// A statement ran but its outcome is unusable.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Schema or revision encoding error.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors raised by host-supplied hooks.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackingError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::NameCollision(_) | Self::UnknownEntity(_) | Self::Core(_) => {
                ErrorKind::Configuration
            }
            Self::ImmutabilityViolation { .. } => ErrorKind::Immutability,
            Self::NotFound { .. }
            | Self::Persistence(_)
            | Self::LibSql(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorKind::Persistence,
        }
    }
}

impl From<rev_config::ConfigError> for TrackingError {
    fn from(e: rev_config::ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}
