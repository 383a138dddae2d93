//! Typed feature dependency edges.

use std::{fmt, str::FromStr};

use super::DomainError;

/// Suffix accepted by the textual form of an optional dependency.
pub const OPTIONAL_MARKER: &str = "[optional]";

/// An edge from a feature to another feature it needs loaded first.
///
/// Optional edges only order the graph; required edges also make the target
/// mandatory at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency {
    pub target: String,
    pub optional: bool,
}

impl Dependency {
    pub fn required(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            optional: false,
        }
    }

    pub fn optional(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            optional: true,
        }
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }
}

impl FromStr for Dependency {
    type Err = DomainError;

    /// Parse `name` or `name[optional]`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (target, optional) = match trimmed.strip_suffix(OPTIONAL_MARKER) {
            Some(target) => (target.trim_end(), true),
            None => (trimmed, false),
        };

        if target.is_empty() || target.contains(['[', ']']) {
            return Err(DomainError::InvalidDependency(raw.to_owned()));
        }

        Ok(Self {
            target: target.to_owned(),
            optional,
        })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}{}", self.target, OPTIONAL_MARKER)
        } else {
            f.write_str(&self.target)
        }
    }
}
