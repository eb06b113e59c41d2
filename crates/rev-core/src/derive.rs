//! History (shadow) schema derivation.
//!
//! The history schema stores only bookkeeping plus the sparse diff of a
//! mutation; none of the tracked type's business attributes are copied.
//! `modelId` borrows the identity attribute's column type, minus every
//! constraint the strip rules name, and is always nullable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::enums::{ColumnType, ConstraintKind};
use crate::errors::CoreError;
use crate::revision;
use crate::schema::{AttributeDef, EntitySchema};

/// Optional author column on a history type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorColumn {
    pub field: String,
    pub column_type: ColumnType,
}

/// Naming and author settings that shape a history schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLayout {
    /// Appended to the tracked type's name.
    pub suffix: String,
    pub author: Option<AuthorColumn>,
}

impl HistoryLayout {
    #[must_use]
    pub fn history_name(&self, tracked: &str) -> String {
        format!("{tracked}{}", self.suffix)
    }

    #[must_use]
    pub fn history_table(&self, tracked_table: &str) -> String {
        format!("{tracked_table}_{}", self.suffix.to_lowercase())
    }
}

/// Derive the history schema for `tracked`.
///
/// # Errors
///
/// Returns the `CoreError` from [`EntitySchema::validate`] if `tracked` is
/// malformed, or `CoreError::Validation` if the layout is unusable (empty
/// suffix, author field clashing with a bookkeeping name).
pub fn derive_history_schema(
    tracked: &EntitySchema,
    strip: &BTreeSet<ConstraintKind>,
    layout: &HistoryLayout,
) -> Result<EntitySchema, CoreError> {
    tracked.validate()?;
    if layout.suffix.is_empty() {
        return Err(CoreError::Validation("history suffix must not be empty".into()));
    }
    if let Some(author) = &layout.author {
        if revision::RESERVED_NAMES.contains(&author.field.as_str()) {
            return Err(CoreError::Validation(format!(
                "author field '{}' clashes with a history bookkeeping name",
                author.field
            )));
        }
    }

    // validate() guarantees the identity attribute exists.
    let identity = tracked
        .identity_attribute()
        .ok_or_else(|| CoreError::MissingIdentity {
            entity: tracked.name.clone(),
            identity: tracked.identity.clone(),
        })?;

    let model_id = AttributeDef {
        name: revision::MODEL_ID.into(),
        field: revision::MODEL_ID_COLUMN.into(),
        column_type: identity.column_type,
        allow_null: true,
        constraints: identity.stripped(strip).constraints,
    };

    let mut schema = EntitySchema::new(
        layout.history_name(&tracked.name),
        layout.history_table(&tracked.table),
        revision::ID,
    )
    .attribute(AttributeDef::surrogate_key(revision::ID).field(revision::ID_COLUMN))
    .attribute(model_id)
    .attribute(
        AttributeDef::new(revision::DIFF, ColumnType::Text)
            .field(revision::DIFF_COLUMN)
            .not_null(),
    )
    .attribute(
        AttributeDef::new(revision::CREATED_AT, ColumnType::Integer)
            .field(revision::CREATED_AT_COLUMN)
            .not_null(),
    );

    if let Some(author) = &layout.author {
        schema = schema.attribute(AttributeDef::new(&author.field, author.column_type));
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Constraint;
    use pretty_assertions::assert_eq;

    fn tracked() -> EntitySchema {
        EntitySchema::new("Task", "tasks", "id")
            .attribute(AttributeDef::surrogate_key("id").constraint(Constraint::Unique))
            .attribute(AttributeDef::new("title", ColumnType::Text).not_null())
            .attribute(AttributeDef::new("status", ColumnType::Text))
    }

    fn layout(author: bool) -> HistoryLayout {
        HistoryLayout {
            suffix: "History".into(),
            author: author.then(|| AuthorColumn {
                field: "author_id".into(),
                column_type: ColumnType::Integer,
            }),
        }
    }

    fn strip_all() -> BTreeSet<ConstraintKind> {
        ConstraintKind::ALL.into_iter().collect()
    }

    #[test]
    fn bookkeeping_fields_only() {
        let history = derive_history_schema(&tracked(), &strip_all(), &layout(false)).unwrap();
        assert_eq!(history.name, "TaskHistory");
        assert_eq!(history.table, "tasks_history");
        assert_eq!(history.identity, "id");
        assert_eq!(
            history.attribute_names().collect::<Vec<_>>(),
            vec!["id", "modelId", "diff", "createdAt"]
        );
        assert!(history.get("title").is_none());
    }

    #[test]
    fn columns_use_prefixed_names() {
        let history = derive_history_schema(&tracked(), &strip_all(), &layout(false)).unwrap();
        let fields: Vec<_> = history.attributes.iter().map(|a| a.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "fk_model_id", "t_diff", "i_created_at"]);
    }

    #[test]
    fn model_id_is_unconstrained_and_nullable() {
        let history = derive_history_schema(&tracked(), &strip_all(), &layout(false)).unwrap();
        let model_id = history.get("modelId").unwrap();
        assert_eq!(model_id.column_type, ColumnType::Integer);
        assert!(model_id.allow_null);
        assert!(model_id.constraints.is_empty());
    }

    #[test]
    fn partial_strip_rules_keep_other_constraints() {
        let strip = [ConstraintKind::PrimaryKey, ConstraintKind::AutoIncrement]
            .into_iter()
            .collect();
        let history = derive_history_schema(&tracked(), &strip, &layout(false)).unwrap();
        assert_eq!(history.get("modelId").unwrap().constraints, vec![Constraint::Unique]);
    }

    #[test]
    fn author_column_is_plain() {
        let history = derive_history_schema(&tracked(), &strip_all(), &layout(true)).unwrap();
        let author = history.get("author_id").unwrap();
        assert_eq!(author.column_type, ColumnType::Integer);
        assert!(author.allow_null);
        assert!(author.constraints.is_empty());
    }

    #[test]
    fn missing_identity_fails_derivation() {
        let mut schema = tracked();
        schema.identity = "uuid".into();
        assert!(matches!(
            derive_history_schema(&schema, &strip_all(), &layout(false)),
            Err(CoreError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn author_field_cannot_shadow_bookkeeping() {
        let mut layout = layout(true);
        if let Some(author) = layout.author.as_mut() {
            author.field = "t_diff".into();
        }
        assert!(matches!(
            derive_history_schema(&tracked(), &strip_all(), &layout),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn derivation_does_not_touch_input() {
        let input = tracked();
        let before = input.clone();
        let _ = derive_history_schema(&input, &strip_all(), &layout(true)).unwrap();
        assert_eq!(input, before);
    }
}
