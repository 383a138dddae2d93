//! Unified error handling for rigup core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for rigup core operations.
#[derive(Debug, Error, Clone)]
pub enum RigupError {
    /// Registration and dependency graph errors.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Feature loading and execution errors.
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl RigupError {
    /// Shorthand for an action-level failure.
    pub fn action(action: impl Into<String>, reason: impl Into<String>) -> Self {
        ApplicationError::ActionFailed {
            action: action.into(),
            reason: reason.into(),
        }
        .into()
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check rigup.toml and RIGUP_* environment variables".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in rigup".into(),
                "Re-run with -vv and include the log when reporting it".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Dependency => ErrorCategory::Configuration,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Startup errors abort before any action runs.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            Self::Domain(_)
                | Self::Configuration { .. }
                | Self::Application(
                    ApplicationError::AutoConfigure { .. }
                        | ApplicationError::InvalidConfiguration { .. }
                )
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Configuration,
    NotFound,
    Execution,
    Internal,
}

/// Convenient result type alias.
pub type RigupResult<T> = Result<T, RigupError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> RigupResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> RigupResult<T> {
        self.map_err(|e| RigupError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_errors_are_configuration_category() {
        let err: RigupError = DomainError::MissingDependency {
            feature: "a".into(),
            dependency: "b".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.is_startup_error());
    }

    #[test]
    fn action_errors_are_not_startup_errors() {
        let err = RigupError::action("x", "boom");
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert!(!err.is_startup_error());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn context_wraps_foreign_errors() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
        let err = result.context("writing cache").unwrap_err();
        assert!(err.to_string().contains("writing cache: disk"));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }
}
