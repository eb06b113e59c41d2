//! Binding tracked types to history types.

use pretty_assertions::assert_eq;

use rev_config::{RevConfig, TrackingConfig};
use rev_core::enums::{ColumnType, LifecycleEvent};
use rev_core::schema::{AttributeDef, EntitySchema};
use rev_db::error::{ErrorKind, TrackingError};
use rev_db::host::Host;
use rev_db::service::LibsqlHost;
use rev_db::tracking::RevisionTracker;

fn entity(name: &str, table: &str) -> EntitySchema {
    EntitySchema::new(name, table, "id")
        .attribute(AttributeDef::surrogate_key("id"))
        .attribute(AttributeDef::new("name", ColumnType::Text))
}

async fn host_with(entities: &[(&str, &str)]) -> LibsqlHost {
    let host = LibsqlHost::open_local(":memory:").await.unwrap();
    for (name, table) in entities {
        host.define_entity(entity(name, table)).await.unwrap();
    }
    host
}

async fn columns(host: &LibsqlHost, table: &str) -> Vec<(String, String, bool)> {
    let mut rows = host
        .db()
        .conn()
        .query(&format!("PRAGMA table_info({table})"), ())
        .await
        .unwrap();
    let mut out = Vec::new();
    while let Some(row) = rows.next().await.unwrap() {
        out.push((
            row.get::<String>(1).unwrap(),
            row.get::<String>(2).unwrap(),
            row.get::<i64>(3).unwrap() == 1,
        ));
    }
    out
}

#[tokio::test]
async fn history_table_has_bookkeeping_columns() {
    let host = host_with(&[("Task", "tasks")]).await;
    RevisionTracker::new()
        .bind(&host, "Task", &TrackingConfig::default().with_author("authorId"))
        .await
        .unwrap();

    assert_eq!(
        columns(&host, "tasks_history").await,
        vec![
            ("id".to_string(), "INTEGER".to_string(), true),
            ("fk_model_id".to_string(), "INTEGER".to_string(), false),
            ("t_diff".to_string(), "TEXT".to_string(), true),
            ("i_created_at".to_string(), "INTEGER".to_string(), true),
            ("authorId".to_string(), "INTEGER".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn bind_twice_fails() {
    let host = host_with(&[("Task", "tasks")]).await;
    let tracker = RevisionTracker::new();
    tracker
        .bind(&host, "Task", &TrackingConfig::default())
        .await
        .unwrap();

    let err = tracker
        .bind(&host, "Task", &TrackingConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(host.hook_count("Task", LifecycleEvent::PreUpdate), 1);
}

#[tokio::test]
async fn unknown_entity_fails() {
    let host = host_with(&[]).await;
    let err = RevisionTracker::new()
        .bind(&host, "Ghost", &TrackingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TrackingError::UnknownEntity(ref name) if name == "Ghost"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn name_collision_aborts_bind() {
    let host = host_with(&[("Project", "projects"), ("ProjectHistory", "project_log")]).await;
    let err = RevisionTracker::new()
        .bind(&host, "Project", &TrackingConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TrackingError::NameCollision(_)));
    assert_eq!(host.hook_count("Project", LifecycleEvent::PreUpdate), 0);
}

#[tokio::test]
async fn bind_all_isolates_failures() {
    let host = host_with(&[
        ("Project", "projects"),
        ("ProjectHistory", "project_log"),
        ("Task", "tasks"),
    ])
    .await;
    let tracker = RevisionTracker::new();

    let bound = tracker.bind_all(&host, &RevConfig::default()).await;

    // "Project" collides with the pre-registered "ProjectHistory"; the
    // latter is an ordinary entity and gets its own history type.
    let names: Vec<_> = bound.keys().cloned().collect();
    assert_eq!(names, vec!["ProjectHistoryHistory", "TaskHistory"]);
    assert!(tracker.handle("Project").is_none());
    assert_eq!(host.hook_count("Task", LifecycleEvent::PreBulkUpdate), 1);
}

#[tokio::test]
async fn bind_all_reports_existing_bindings_and_skips_history_types() {
    let host = host_with(&[("Task", "tasks")]).await;
    let tracker = RevisionTracker::new();
    tracker
        .bind(&host, "Task", &TrackingConfig::default())
        .await
        .unwrap();

    let bound = tracker.bind_all(&host, &RevConfig::default()).await;

    assert_eq!(bound.keys().cloned().collect::<Vec<_>>(), vec!["TaskHistory"]);
    assert_eq!(
        host.entity_names(),
        vec!["Task".to_string(), "TaskHistory".to_string()]
    );
}

#[tokio::test]
async fn bind_all_uses_entity_overrides() {
    let host = host_with(&[("Task", "tasks")]).await;
    let mut config = RevConfig::default();
    config.entities.insert(
        "Task".into(),
        TrackingConfig {
            suffix: "Log".into(),
            ..TrackingConfig::default()
        },
    );

    let bound = RevisionTracker::new().bind_all(&host, &config).await;

    let handle = &bound["TaskLog"];
    assert_eq!(handle.schema().table, "tasks_log");
}
