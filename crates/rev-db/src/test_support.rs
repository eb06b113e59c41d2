//! Shared helpers for rev-db unit tests.

use rev_core::Record;
use rev_core::enums::ColumnType;
use rev_core::schema::{AttributeDef, Constraint, EntitySchema};
use serde_json::json;

use crate::service::LibsqlHost;

/// In-memory host with nothing registered.
pub async fn test_host() -> LibsqlHost {
    init_tracing();
    LibsqlHost::open_local(":memory:").await.unwrap()
}

/// `Task` stored in `tasks`, identified by an auto-increment `id`.
pub fn task_schema() -> EntitySchema {
    EntitySchema::new("Task", "tasks", "id")
        .attribute(AttributeDef::surrogate_key("id"))
        .attribute(AttributeDef::new("title", ColumnType::Text).not_null())
        .attribute(
            AttributeDef::new("status", ColumnType::Text)
                .constraint(Constraint::DefaultValue(json!("open"))),
        )
        .attribute(AttributeDef::new("priority", ColumnType::Integer))
        .attribute(AttributeDef::new("updated_at", ColumnType::Text))
}

pub fn task(title: &str, priority: i64) -> Record {
    let mut row = Record::new();
    row.insert("title".into(), json!(title));
    row.insert("status".into(), json!("open"));
    row.insert("priority".into(), json!(priority));
    row
}

/// Log to the test writer when `REVTRACK_LOG` is set.
pub fn init_tracing() {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_env("REVTRACK_LOG") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}
