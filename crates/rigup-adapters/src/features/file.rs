//! `file`: walks the project tree and announces every file.

use std::{cell::RefCell, path::Path, rc::Rc};

use rigup_core::{
    application::{Action, Engine, Feature, resolve_section},
    domain::{Dependency, EventArgs, EventBindings, RegistryObject},
    error::RigupResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use super::support::{fs_error, project_home, wildcard_match};

pub const NAME: &str = "file";

/// Emitted once per file, with the absolute path under `file`.
pub const FILE_FOUND: &str = "file:found";
/// Emitted by any action that generated a file (`source`, `target`).
pub const FILE_GENERATED: &str = "file:generated";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Wildcard patterns matched against path components and relative paths.
    pub excludes: Vec<String>,
    pub disabled: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            excludes: [".git", "node_modules", "vendor", "target", ".bin", ".idea", ".vscode"]
                .map(String::from)
                .to_vec(),
            disabled: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct FileFeature {
    excludes: RefCell<Vec<String>>,
}

impl RegistryObject for FileFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for FileFeature {
    fn description(&self) -> &str {
        "Walk project files and emit events"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::required("core")]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let config: FileConfig = resolve_section(engine, NAME, |_| Ok(()))?;
        *self.excludes.borrow_mut() = config.excludes;
        Ok(())
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(FileWalkAction {
            excludes: self.excludes.borrow().clone(),
        })]
    }
}

pub struct FileWalkAction {
    excludes: Vec<String>,
}

impl FileWalkAction {
    fn is_excluded(&self, relative: &Path) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }
        let joined = relative.to_string_lossy().replace('\\', "/");
        self.excludes.iter().any(|pattern| {
            wildcard_match(pattern, &joined)
                || relative
                    .components()
                    .any(|c| wildcard_match(pattern, &c.as_os_str().to_string_lossy()))
        })
    }
}

impl RegistryObject for FileWalkAction {
    fn name(&self) -> &str {
        "file:walk"
    }
}

impl Action for FileWalkAction {
    fn description(&self) -> String {
        "Emit an event for every file of the project".into()
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:configure".into()
    }

    fn order(&self) -> i32 {
        -100
    }

    fn execute(&self, engine: &Engine, _args: &EventArgs) -> RigupResult<Value> {
        let root = project_home(engine);
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry
                    .path()
                    .strip_prefix(&root)
                    .map_or(true, |relative| !self.is_excluded(relative))
            });

        let mut found = 0usize;
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).to_path_buf();
                fs_error(&path, "walk directory", e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            found += 1;
            let file = entry.path().to_string_lossy().into_owned();
            engine.emit(FILE_FOUND, &EventArgs::new().kwarg("file", file))?;
        }

        debug!(files = found, root = %root.display(), "Walked project files");
        Ok(Value::from(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker(excludes: &[&str]) -> FileWalkAction {
        FileWalkAction {
            excludes: excludes.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn excludes_match_any_component() {
        let action = walker(&[".git", "*.log"]);
        assert!(action.is_excluded(Path::new(".git/config")));
        assert!(action.is_excluded(Path::new("src/debug.log")));
        assert!(!action.is_excluded(Path::new("src/main.rs")));
    }

    #[test]
    fn excludes_match_relative_paths() {
        let action = walker(&["docs/*"]);
        assert!(action.is_excluded(Path::new("docs/index.md")));
        assert!(!action.is_excluded(Path::new("src/docs.rs")));
    }

    #[test]
    fn root_is_never_excluded() {
        assert!(!walker(&["*"]).is_excluded(Path::new("")));
    }
}
