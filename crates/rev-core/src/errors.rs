//! Error types for schema handling and revision encoding.
//!
//! Persistence and hook errors are defined in `rev-db`, which wraps
//! `CoreError` as a configuration or serialization failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The schema names an identity attribute it does not declare.
    #[error("Entity '{entity}' declares identity '{identity}' but has no such attribute")]
    MissingIdentity { entity: String, identity: String },

    /// Two attributes share a name or a column.
    #[error("Entity '{entity}' declares '{attribute}' more than once")]
    DuplicateAttribute { entity: String, attribute: String },

    /// Data failed validation (names, layout).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A diff payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
