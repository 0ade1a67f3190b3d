//! Configuration models and file loading.
//!
//! This crate owns the Steward config schema and the small loader used by
//! binaries and the SDK surface.

mod error;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Configuration schema models.
pub use model::*;

use log::info;
use std::path::Path;

/// Load a config from a JSON/JSON5 file, applying schema defaults.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<StewardConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let config: StewardConfig = json5::from_str(&raw)?;
    info!("loaded config (path={})", path.display());
    validate(&config)?;
    Ok(config)
}

/// Validate cross-field constraints that serde defaults cannot express.
fn validate(config: &StewardConfig) -> Result<(), ConfigError> {
    if config.orchestrator.max_turns == 0 {
        return Err(ConfigError::InvalidField {
            path: "orchestrator.max_turns".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::InvalidField {
            path: "retry.max_attempts".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
