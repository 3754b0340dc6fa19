//! Configuration loading functionality.
//!
//! This module provides [`ConfigLoader`] for loading an [`EngineConfig`]
//! snapshot from a YAML file and validating it before use.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::EngineConfig;

/// Loads and validates an engine configuration snapshot.
///
/// # File layout
///
/// The whole snapshot lives in one YAML file:
///
/// ```text
/// config/engine.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use folha_engine::config::ConfigLoader;
///
/// let config = ConfigLoader::load("./config/engine.yaml")?;
/// println!("Institution: {}", config.institution.name);
/// # Ok::<(), folha_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration from the specified YAML file.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ConfigNotFound`] if the file does not exist.
    /// - [`EngineError::ConfigParseError`] on invalid YAML.
    /// - [`EngineError::BracketTableInvalid`] or
    ///   [`EngineError::CalculationError`] when the snapshot fails
    ///   validation (invalid tables, duplicate rubrica order indexes).
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<EngineConfig> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let config: EngineConfig =
            serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
                path: path_str,
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }
}
