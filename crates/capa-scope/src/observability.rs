//! Subscriber setup for the controller binary hosting the scope.
//!
//! The filter comes from [`LoggingConfig::level`], so `CAPA__LOGGING__LEVEL`
//! overrides it through the config loader. `RUST_LOG` is not consulted.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::{ConfigError, LoggingConfig};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs a global `fmt` subscriber filtered by `logging.level`.
///
/// Returns `Ok(false)` when some other global subscriber was already set;
/// nothing is replaced in that case.
///
/// # Errors
///
/// Returns `ConfigError::Validation` when the level is not a valid filter.
pub fn init_tracing(logging: &LoggingConfig) -> Result<bool, ConfigError> {
    let (filter, handle) = reload::Layer::new(logging.filter()?);
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER_HANDLE.set(handle);
    }
    Ok(installed)
}

/// Swaps the active filter of the subscriber installed by [`init_tracing`].
///
/// # Errors
///
/// Returns `ConfigError::Validation` for an invalid level and
/// `ConfigError::Logging` when no subscriber was installed or the swap fails.
pub fn reload_level(level: &str) -> Result<(), ConfigError> {
    let filter = LoggingConfig {
        level: level.to_string(),
    }
    .filter()?;
    let handle = FILTER_HANDLE
        .get()
        .ok_or_else(|| ConfigError::Logging("tracing subscriber not installed".into()))?;
    handle
        .reload(filter)
        .map_err(|e| ConfigError::Logging(e.to_string()))
}
