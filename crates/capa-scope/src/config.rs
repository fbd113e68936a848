use serde::{Deserialize, Serialize};

/// What a scope diffs against after it has committed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Every commit diffs against the snapshot taken at construction.
    #[default]
    Preserve,
    /// A successful commit makes the committed state the new baseline.
    RefreshAfterCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopeSettings {
    #[serde(default)]
    pub baseline_policy: BaselinePolicy,
    /// Send the object's resourceVersion with every patch.
    #[serde(default)]
    pub optimistic_lock: bool,
    /// Stamp `status.observedGeneration` from `metadata.generation` on commit.
    #[serde(default)]
    pub observed_generation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl LoggingConfig {
    /// Parses `level` as an `EnvFilter` directive list.
    pub fn filter(&self) -> Result<tracing_subscriber::EnvFilter, ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Validation("logging.level must not be empty".into()));
        }
        tracing_subscriber::EnvFilter::try_new(&self.level).map_err(|e| {
            ConfigError::Validation(format!(
                "logging.level '{}' is not a valid filter: {e}",
                self.level
            ))
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub scope: ScopeSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("logging setup error: {0}")]
    Logging(String),
}

impl ScopeConfig {
    /// Parse from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let parsed: Self = toml::from_str(toml_str)
            .map_err(|e| ConfigError::Parse(format!("TOML parse error: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.filter()?;
        Ok(())
    }
}

pub mod loader {
    use super::{ConfigError, ScopeConfig};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Default configuration file looked up when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "capa-scope.toml";

    pub fn load_config(path: Option<&str>) -> Result<ScopeConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CAPA__SCOPE__OPTIMISTIC_LOCK=true
        builder = builder.add_source(
            Environment::with_prefix("CAPA")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: ScopeConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<ScopeConfig, ConfigError> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
