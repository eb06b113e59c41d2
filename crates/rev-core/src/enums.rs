//! Column types, constraint kinds, and lifecycle events.
//!
//! All enums use `snake_case` serialization so they read naturally in
//! TOML configuration and JSON payloads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ColumnType
// ---------------------------------------------------------------------------

/// Storage type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    /// Structured value stored as JSON text.
    Json,
}

impl ColumnType {
    /// SQL type affinity used in `CREATE TABLE`.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Text | Self::Json => "TEXT",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConstraintKind
// ---------------------------------------------------------------------------

/// Discriminant of a [`Constraint`](crate::schema::Constraint).
///
/// Strip rules name constraint kinds; a kind in the rule set is never
/// carried onto a history column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    AutoIncrement,
    DefaultValue,
    Computed,
    References,
}

impl ConstraintKind {
    pub const ALL: [Self; 6] = [
        Self::Unique,
        Self::PrimaryKey,
        Self::AutoIncrement,
        Self::DefaultValue,
        Self::Computed,
        Self::References,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::PrimaryKey => "primary_key",
            Self::AutoIncrement => "auto_increment",
            Self::DefaultValue => "default_value",
            Self::Computed => "computed",
            Self::References => "references",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Pre-mutation hook sites a host fires for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    PreUpdate,
    PreDestroy,
    PreBulkUpdate,
    PreBulkDestroy,
}

impl LifecycleEvent {
    pub const ALL: [Self; 4] = [
        Self::PreUpdate,
        Self::PreDestroy,
        Self::PreBulkUpdate,
        Self::PreBulkDestroy,
    ];

    /// Whether the event is fired once for a predicate-driven mutation.
    #[must_use]
    pub const fn is_bulk(self) -> bool {
        matches!(self, Self::PreBulkUpdate | Self::PreBulkDestroy)
    }

    /// Whether the event precedes a removal.
    #[must_use]
    pub const fn is_destroy(self) -> bool {
        matches!(self, Self::PreDestroy | Self::PreBulkDestroy)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreUpdate => "pre_update",
            Self::PreDestroy => "pre_destroy",
            Self::PreBulkUpdate => "pre_bulk_update",
            Self::PreBulkDestroy => "pre_bulk_destroy",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ConstraintKind::AutoIncrement).unwrap();
        assert_eq!(json, "\"auto_increment\"");
        let back: ConstraintKind = serde_json::from_str("\"primary_key\"").unwrap();
        assert_eq!(back, ConstraintKind::PrimaryKey);
    }

    #[test]
    fn lifecycle_event_classification() {
        assert!(LifecycleEvent::PreBulkUpdate.is_bulk());
        assert!(!LifecycleEvent::PreUpdate.is_bulk());
        assert!(LifecycleEvent::PreBulkDestroy.is_destroy());
        assert!(!LifecycleEvent::PreBulkUpdate.is_destroy());
    }

    #[test]
    fn boolean_and_integer_share_affinity() {
        assert_eq!(ColumnType::Boolean.sql_type(), ColumnType::Integer.sql_type());
        assert_eq!(ColumnType::Json.sql_type(), "TEXT");
    }
}
