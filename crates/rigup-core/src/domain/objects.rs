use std::path::PathBuf;

use super::RegistryObject;

/// An executable a feature exposes to the project (usually a container
/// command) under a short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    name: String,
    pub command: Vec<String>,
    pub workdir: Option<PathBuf>,
}

impl Binary {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            workdir: None,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Full command line with caller arguments appended.
    pub fn command_line<S: AsRef<str>>(&self, extra: &[S]) -> Vec<String> {
        self.command
            .iter()
            .cloned()
            .chain(extra.iter().map(|s| s.as_ref().to_owned()))
            .collect()
    }
}

impl RegistryObject for Binary {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A long-running service a feature declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    name: String,
    pub feature: String,
}

impl Service {
    pub fn new(name: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature: feature.into(),
        }
    }
}

impl RegistryObject for Service {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_appends_arguments() {
        let psql = Binary::new("psql", vec!["docker".into(), "exec".into(), "db".into()]);
        assert_eq!(
            psql.command_line(&["-U", "app"]),
            vec!["docker", "exec", "db", "-U", "app"]
        );
    }
}
