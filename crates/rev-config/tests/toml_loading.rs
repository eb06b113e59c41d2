//! Integration tests for TOML and environment configuration loading.
//!
//! Uses `figment::Jail` for safe, sandboxed file and env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use rev_config::{ConfigError, RevConfig};
use rev_core::enums::{ColumnType, ConstraintKind};

#[test]
fn loads_tracking_section_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[tracking]
author_field = "author_id"
author_type = "text"
suffix = "Revision"
exclude = ["updated_at", "search_vector"]
strip = ["primary_key", "auto_increment"]
"#,
        )?;

        let config: RevConfig = Figment::from(Serialized::defaults(RevConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.tracking.author_field.as_deref(), Some("author_id"));
        assert_eq!(config.tracking.author_type, ColumnType::Text);
        assert_eq!(config.tracking.suffix, "Revision");
        assert_eq!(
            config.tracking.exclude.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["search_vector", "updated_at"]
        );
        assert_eq!(
            config.tracking.strip.into_iter().collect::<Vec<_>>(),
            vec![ConstraintKind::PrimaryKey, ConstraintKind::AutoIncrement]
        );
        Ok(())
    });
}

#[test]
fn entity_override_replaces_shared_section() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[tracking]
author_field = "author_id"

[entities.Invoice]
suffix = "Audit"
"#,
        )?;

        let config: RevConfig = Figment::from(Serialized::defaults(RevConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        let invoice = config.tracking_for("Invoice");
        assert_eq!(invoice.suffix, "Audit");
        assert!(!invoice.tracks_author(), "overrides do not inherit fields");

        let task = config.tracking_for("Task");
        assert_eq!(task.suffix, "History");
        assert!(task.tracks_author());
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[tracking]
suffix = "FromToml"
"#,
        )?;
        jail.set_env("REVTRACK_TRACKING__SUFFIX", "FromEnv");
        jail.set_env("REVTRACK_TRACKING__AUTHOR_FIELD", "editor_id");

        let config: RevConfig = Figment::from(Serialized::defaults(RevConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("REVTRACK_").split("__"))
            .extract()?;

        assert_eq!(config.tracking.suffix, "FromEnv");
        assert_eq!(config.tracking.author_field.as_deref(), Some("editor_id"));
        Ok(())
    });
}

#[test]
fn load_reads_project_file_and_validates() {
    Jail::expect_with(|jail| {
        jail.create_dir(".revtrack")?;
        jail.create_file(
            ".revtrack/config.toml",
            r#"
[tracking]
author_field = "t_diff"
"#,
        )?;

        let err = RevConfig::load().expect_err("reserved author field must be rejected");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        Ok(())
    });
}

#[test]
fn load_without_files_uses_defaults() {
    Jail::expect_with(|_jail| {
        let config = RevConfig::load().expect("defaults load");
        assert_eq!(config, RevConfig::default());
        Ok(())
    });
}
