//! Serde roundtrip and JsonSchema validation tests for persisted shapes.

use chrono::{DateTime, Utc};
use schemars::schema_for;
use serde_json::json;

use rev_core::Record;
use rev_core::author::AuthorId;
use rev_core::enums::{ColumnType, ConstraintKind, LifecycleEvent};
use rev_core::predicate::Predicate;
use rev_core::revision::Revision;
use rev_core::schema::{AttributeDef, Constraint, EntitySchema};

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            // Serde roundtrip
            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            // Schema validation
            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

roundtrip_and_validate!(
    revision_with_author_roundtrip,
    Revision,
    Revision {
        id: Some(41),
        model_id: Some(json!(7)),
        diff: {
            let mut diff = Record::new();
            diff.insert("status".into(), json!("open"));
            diff.insert("priority".into(), json!(2));
            diff
        },
        created_at: at(1_760_000_000),
        author: Some(AuthorId::Integer(12)),
    }
);

roundtrip_and_validate!(
    revision_bulk_shape_roundtrip,
    Revision,
    Revision {
        id: None,
        model_id: None,
        diff: Record::new(),
        created_at: at(1_760_000_001),
        author: Some(AuthorId::Text("migration-bot".into())),
    }
);

roundtrip_and_validate!(
    entity_schema_roundtrip,
    EntitySchema,
    EntitySchema::new("Task", "tasks", "id")
        .attribute(AttributeDef::surrogate_key("id"))
        .attribute(AttributeDef::new("title", ColumnType::Text).not_null())
        .attribute(
            AttributeDef::new("status", ColumnType::Text)
                .constraint(Constraint::DefaultValue(json!("open")))
        )
        .attribute(
            AttributeDef::new("project_id", ColumnType::Integer).constraint(
                Constraint::References {
                    table: "projects".into(),
                    column: "id".into(),
                }
            )
        )
);

roundtrip_and_validate!(
    predicate_roundtrip,
    Predicate,
    Predicate::all()
        .eq("status", "open")
        .is_in("priority", [1, 2])
        .is_null("archived_at")
);

roundtrip_and_validate!(
    lifecycle_event_roundtrip,
    LifecycleEvent,
    LifecycleEvent::PreBulkDestroy
);

roundtrip_and_validate!(
    constraint_kind_roundtrip,
    ConstraintKind,
    ConstraintKind::Computed
);
