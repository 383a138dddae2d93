// ============================================================================
// domain/error.rs - REGISTRATION AND TOPOLOGY ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// Every variant here is a startup failure: it is raised before any action
/// runs and leaves no partial state behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Registration
    // ========================================================================
    #[error("{kind} '{name}' is already registered")]
    DuplicateName { kind: &'static str, name: String },

    // ========================================================================
    // Dependency graph
    // ========================================================================
    #[error("A required dependency is missing for {feature} feature ({dependency})")]
    MissingDependency { feature: String, dependency: String },

    #[error("Circular dependency detected between features: {}", .features.join(", "))]
    DependencyCycle { features: Vec<String> },

    #[error("Invalid dependency declaration '{0}'")]
    InvalidDependency(String),
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::DuplicateName { kind, name } => vec![
                format!("Two {kind}s are both named '{name}'"),
                "Rename or disable one of the conflicting plugins".into(),
            ],
            Self::MissingDependency {
                feature,
                dependency,
            } => vec![
                format!("Feature '{feature}' cannot run without '{dependency}'"),
                format!("Install or enable the '{dependency}' feature"),
                format!("Or disable '{feature}' with `{feature}.disabled = true`"),
            ],
            Self::DependencyCycle { features } => vec![
                format!("These features depend on each other: {}", features.join(" -> ")),
                "Check the `dependencies` table in your configuration".into(),
            ],
            Self::InvalidDependency(raw) => vec![
                format!("Could not parse '{raw}'"),
                "Use `name` or `name[optional]`".into(),
            ],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateName { .. } => ErrorCategory::Internal,
            Self::MissingDependency { .. } | Self::DependencyCycle { .. } => {
                ErrorCategory::Dependency
            }
            Self::InvalidDependency(_) => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Dependency,
    Internal,
}
