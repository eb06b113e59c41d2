//! # rev-config
//!
//! Layered configuration loading for revision tracking using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`REVTRACK_*` prefix, `__` as separator)
//! 2. Project-level `.revtrack/config.toml`
//! 3. User-level `~/.config/revtrack/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `REVTRACK_TRACKING__AUTHOR_FIELD` -> `tracking.author_field`,
//! `REVTRACK_ENTITIES__TASK__SUFFIX` -> `entities.task.suffix`, etc. Env keys
//! are lowercased by figment, so per-entity overrides that must match a
//! mixed-case type name belong in TOML.
//!
//! # Usage
//!
//! ```no_run
//! use rev_config::RevConfig;
//!
//! let config = RevConfig::load_with_dotenv().expect("config");
//! let task = config.tracking_for("Task");
//! println!("history suffix: {}", task.suffix);
//! ```

mod error;
mod tracking;

pub use error::ConfigError;
pub use tracking::TrackingConfig;

use std::collections::BTreeMap;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RevConfig {
    /// Settings applied to every tracked type.
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Full replacements of `tracking` for individual types, keyed by type name.
    #[serde(default)]
    pub entities: BTreeMap<String, TrackingConfig>,
}

impl RevConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed, or
    /// `ConfigError::InvalidValue` if the merged result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".revtrack/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("REVTRACK_").split("__"))
    }

    /// Tracking settings for one type: its override if present, else the
    /// shared `tracking` section.
    #[must_use]
    pub fn tracking_for(&self, type_name: &str) -> TrackingConfig {
        self.entities
            .get(type_name)
            .unwrap_or(&self.tracking)
            .clone()
    }

    /// Validate the shared section and every override.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::InvalidValue` found; override errors
    /// name the entity in the field path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracking.validate()?;
        for (name, config) in &self.entities {
            config.validate().map_err(|e| match e {
                ConfigError::InvalidValue { field, reason } => ConfigError::InvalidValue {
                    field: format!("entities.{name}.{field}"),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("revtrack").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) or current dir looking
    /// for a `.env` file. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
