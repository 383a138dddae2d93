//! `gitignore`: keeps generated files out of version control.

use std::{cell::Cell, fs, path::Path, rc::Rc};

use rigup_core::{
    application::{Action, Engine, Feature, resolve_section},
    domain::{Dependency, EventArgs, EventBindings, RegistryObject},
    error::{RigupError, RigupResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    file::FILE_GENERATED,
    support::{fs_error, project_home},
};

pub const NAME: &str = "gitignore";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitignoreConfig {
    /// Add generated files to `.gitignore`.
    pub enforce: bool,
    pub disabled: bool,
}

impl Default for GitignoreConfig {
    fn default() -> Self {
        Self {
            enforce: true,
            disabled: false,
        }
    }
}

#[derive(Debug)]
pub struct GitignoreFeature {
    enforce: Cell<bool>,
}

impl Default for GitignoreFeature {
    fn default() -> Self {
        Self {
            enforce: Cell::new(true),
        }
    }
}

impl RegistryObject for GitignoreFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for GitignoreFeature {
    fn description(&self) -> &str {
        "Automate .gitignore file update"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::required("core")]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let config: GitignoreConfig = resolve_section(engine, NAME, |_| Ok(()))?;
        self.enforce.set(config.enforce);
        Ok(())
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(UpdateGitignoreAction {
            enforce: self.enforce.get(),
        })]
    }
}

pub struct UpdateGitignoreAction {
    enforce: bool,
}

impl RegistryObject for UpdateGitignoreAction {
    fn name(&self) -> &str {
        "gitignore:update"
    }
}

impl Action for UpdateGitignoreAction {
    fn description(&self) -> String {
        "Add generated files to .gitignore".into()
    }

    fn event_bindings(&self) -> EventBindings {
        FILE_GENERATED.into()
    }

    fn disabled(&self, _engine: &Engine) -> bool {
        !self.enforce
    }

    fn execute(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        let target = args
            .get_str("target")
            .ok_or_else(|| RigupError::action(self.name(), "missing target argument"))?;

        let root = project_home(engine);
        let Some(entry) = ignore_entry(&root, Path::new(target)) else {
            debug!(target = target, "Generated file is outside the project");
            return Ok(Value::Bool(false));
        };

        let gitignore = root.join(".gitignore");
        let existing = match fs::read_to_string(&gitignore) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(fs_error(&gitignore, "read .gitignore", e)),
        };

        if existing.lines().any(|line| line.trim() == entry) {
            return Ok(Value::Bool(false));
        }

        let mut updated = existing;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&entry);
        updated.push('\n');
        fs::write(&gitignore, updated).map_err(|e| fs_error(&gitignore, "write .gitignore", e))?;

        debug!(entry = %entry, "Added to .gitignore");
        Ok(Value::Bool(true))
    }
}

/// `/relative/path` for a file under `root`.
fn ignore_entry(root: &Path, target: &Path) -> Option<String> {
    let relative = target.strip_prefix(root).ok()?;
    let joined = relative.to_string_lossy().replace('\\', "/");
    (!joined.is_empty()).then(|| format!("/{joined}"))
}
