//! Layered configuration for the CLI: problem parameters and the log filter.
//!
//! Resolution order, later layers winning:
//!
//! ```text
//! defaults ──► --params-file (JSON holder) ──► --param key=value ──► --random-starts
//! ```

use mountaincar_core::params::RANDOM_START_STATES;
use mountaincar_core::{ConfigError, ParameterHolder, Parameters};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Errors raised while assembling parameters.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected key=value, got '{0}'")]
    BadOverride(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Parameter sources collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct ParamSources {
    /// JSON parameter holder file
    pub file: Option<PathBuf>,

    /// `key=value` overrides, applied in order
    pub overrides: Vec<String>,

    /// Force random start states on
    pub random_starts: bool,
}

impl ParamSources {
    /// Builds the merged holder without validating it.
    pub fn holder(&self) -> Result<ParameterHolder, SetupError> {
        let mut holder = Parameters::default_holder();

        if let Some(path) = &self.file {
            let json = std::fs::read_to_string(path).map_err(|source| SetupError::Io {
                path: path.clone(),
                source,
            })?;
            holder.merge(&ParameterHolder::from_json(&json)?);
            debug!("Loaded parameters from {}", path.display());
        }

        for entry in &self.overrides {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| SetupError::BadOverride(entry.clone()))?;
            holder.set_from_str(key.trim(), value.trim())?;
        }

        if self.random_starts {
            holder.add_bool_param(RANDOM_START_STATES, true);
        }
        Ok(holder)
    }

    /// Resolves and validates the final parameters.
    pub fn resolve(&self) -> Result<Parameters, SetupError> {
        Ok(Parameters::from_holder(&self.holder()?)?)
    }
}

/// Chooses the log filter directive: an explicit `RUST_LOG` value wins,
/// otherwise `--verbose` selects `debug` over `info`.
pub fn log_directive(verbose: bool, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        Some(directive) if !directive.is_empty() => directive.to_string(),
        _ if verbose => "debug".to_string(),
        _ => "info".to_string(),
    }
}
