use std::path::PathBuf;

use rigup_core::error::RigupError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),

    #[error("Configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Cannot determine the {0} directory")]
    NoDirectory(&'static str),

    #[error("Configuration root must be a table")]
    NotATable,
}

impl From<ConfigLoadError> for RigupError {
    fn from(err: ConfigLoadError) -> Self {
        RigupError::Configuration {
            message: err.to_string(),
        }
    }
}
