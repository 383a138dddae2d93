//! Application layer errors.
//!
//! These errors come from loading features and running commands. Graph and
//! registration problems are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during feature loading and command execution.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A feature could not derive an environment-dependent default.
    #[error("Feature '{feature}' could not auto-configure '{key}': {reason}")]
    AutoConfigure {
        feature: String,
        key: String,
        reason: String,
    },

    /// A configuration subtree does not match the feature's schema.
    #[error("Invalid configuration for '{key}': {reason}")]
    InvalidConfiguration { key: String, reason: String },

    /// No command is registered under this name.
    #[error("Unknown command '{name}'")]
    UnknownCommand { name: String },

    /// A command references a phase no enabled feature provides.
    #[error("Unknown phase '{name}'")]
    UnknownPhase { name: String },

    /// A binding names a method the action does not implement.
    #[error("Action '{action}' has no method '{method}'")]
    UnknownMethod { action: String, method: String },

    /// A command asked to restart while already restarting.
    #[error("Command '{command}' requested a restart more than once")]
    RestartLoop { command: String },

    /// An action failed while handling an event.
    #[error("{reason}")]
    ActionFailed { action: String, reason: String },

    /// Template rendering failed.
    #[error("Template rendering failed: {reason}")]
    RenderingFailed { reason: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Cache backend failed to persist or load.
    #[error("Cache '{namespace}' error: {reason}")]
    CacheError { namespace: String, reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::AutoConfigure { feature, key, .. } => vec![
                format!("Set '{feature}.{key}' explicitly in rigup.toml"),
                format!("Or disable the feature with `{feature}.disabled = true`"),
            ],
            Self::InvalidConfiguration { key, .. } => vec![
                format!("Check the [{key}] table in your configuration"),
                "Run `rigup info` to see the effective configuration".into(),
            ],
            Self::UnknownCommand { .. } => vec![
                "Run `rigup --help` to list available commands".into(),
                "The command may belong to a disabled feature".into(),
            ],
            Self::UnknownPhase { name } => vec![
                format!("No enabled feature provides the '{name}' phase"),
                "Enable the feature that declares it".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::RestartLoop { .. } => vec![
                "A command may restart itself only once per invocation".into(),
                "This is likely a plugin bug".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AutoConfigure { .. } | Self::InvalidConfiguration { .. } => {
                ErrorCategory::Configuration
            }
            Self::UnknownCommand { .. } => ErrorCategory::NotFound,
            Self::UnknownPhase { .. } => ErrorCategory::Configuration,
            Self::ActionFailed { .. } | Self::RenderingFailed { .. } => ErrorCategory::Execution,
            Self::UnknownMethod { .. }
            | Self::RestartLoop { .. }
            | Self::FilesystemError { .. }
            | Self::CacheError { .. } => ErrorCategory::Internal,
        }
    }
}
