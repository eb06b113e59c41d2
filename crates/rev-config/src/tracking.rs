//! Per-type tracking configuration.

use std::collections::BTreeSet;

use rev_core::derive::{AuthorColumn, HistoryLayout};
use rev_core::enums::{ColumnType, ConstraintKind};
use rev_core::revision::RESERVED_NAMES;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_suffix() -> String {
    "History".to_string()
}

const fn default_author_type() -> ColumnType {
    ColumnType::Integer
}

fn default_exclude() -> BTreeSet<String> {
    ["created_at", "updated_at"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_strip() -> BTreeSet<ConstraintKind> {
    ConstraintKind::ALL.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Author attribute on the history type. Absent disables author tracking.
    #[serde(default)]
    pub author_field: Option<String>,

    /// Storage type of the author attribute.
    #[serde(default = "default_author_type")]
    pub author_type: ColumnType,

    /// Appended to the tracked type's name to form the history type's name.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Attributes never reported in a diff.
    #[serde(default = "default_exclude")]
    pub exclude: BTreeSet<String>,

    /// Constraint kinds removed from attributes copied onto the history type.
    #[serde(default = "default_strip")]
    pub strip: BTreeSet<ConstraintKind>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            author_field: None,
            author_type: default_author_type(),
            suffix: default_suffix(),
            exclude: default_exclude(),
            strip: default_strip(),
        }
    }
}

impl TrackingConfig {
    #[must_use]
    pub fn with_author(mut self, field: impl Into<String>) -> Self {
        self.author_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn exclude(mut self, attribute: impl Into<String>) -> Self {
        self.exclude.insert(attribute.into());
        self
    }

    #[must_use]
    pub const fn tracks_author(&self) -> bool {
        self.author_field.is_some()
    }

    /// History naming and author column derived from this config.
    #[must_use]
    pub fn layout(&self) -> HistoryLayout {
        HistoryLayout {
            suffix: self.suffix.clone(),
            author: self.author_field.as_ref().map(|field| AuthorColumn {
                field: field.clone(),
                column_type: self.author_type,
            }),
        }
    }

    /// Reject values that cannot produce a usable history type.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty or non-alphanumeric
    /// suffix, or an author field that is empty or collides with a history
    /// bookkeeping name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suffix.is_empty() || !self.suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidValue {
                field: "suffix".into(),
                reason: format!("'{}' must be non-empty and alphanumeric", self.suffix),
            });
        }
        if let Some(field) = &self.author_field {
            if field.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "author_field".into(),
                    reason: "must not be empty".into(),
                });
            }
            if RESERVED_NAMES.contains(&field.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "author_field".into(),
                    reason: format!("'{field}' is a history bookkeeping name"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = TrackingConfig::default();
        assert!(!config.tracks_author());
        assert_eq!(config.suffix, "History");
        assert_eq!(config.author_type, ColumnType::Integer);
        assert!(config.exclude.contains("updated_at"));
        assert_eq!(config.strip.len(), ConstraintKind::ALL.len());
        config.validate().unwrap();
    }

    #[test]
    fn layout_carries_author_column() {
        let layout = TrackingConfig::default().with_author("author_id").layout();
        let author = layout.author.unwrap();
        assert_eq!(author.field, "author_id");
        assert_eq!(author.column_type, ColumnType::Integer);
    }

    #[test]
    fn reserved_author_field_is_invalid() {
        let config = TrackingConfig::default().with_author("modelId");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "author_field"
        ));
    }

    #[test]
    fn suffix_must_be_identifier_safe() {
        let config = TrackingConfig {
            suffix: "his tory".into(),
            ..TrackingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
