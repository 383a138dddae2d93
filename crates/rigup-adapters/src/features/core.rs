//! `core`: base phases, commands and project settings.

use std::{path::PathBuf, rc::Rc};

use rigup_core::{
    application::{Action, Command, Engine, Feature, PhaseCommand, resolve_section},
    domain::{EventArgs, EventBindings, Phase, RegistryObject},
    error::{RigupError, RigupResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::support::strip_nulls;

pub const NAME: &str = "core";

const SEPARATOR: &str = "----------------------------------------------------------------";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub project: ProjectConfig,
    pub env: EnvConfig,
    pub path: PathConfig,
    pub fail_fast: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvConfig {
    pub current: Option<String>,
    pub available: Vec<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            current: None,
            available: ["prod", "stage", "ci", "dev"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    pub project_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub rigup_home: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct CoreFeature;

impl RegistryObject for CoreFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for CoreFeature {
    fn description(&self) -> &str {
        "Default commands and configuration support"
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let paths = engine.config().paths();
        resolve_section(engine, NAME, |config: &mut CoreConfig| {
            if config.project.name.is_none() {
                config.project.name = paths
                    .project_home
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
            }

            if config.env.current.is_none() {
                config.env.current = config.env.available.last().cloned();
            }
            if let Some(current) = &config.env.current {
                if !config.env.available.contains(current) {
                    return Err(RigupError::Configuration {
                        message: format!(
                            "core.env.current '{current}' is not one of core.env.available"
                        ),
                    });
                }
            }

            config.path.project_home.get_or_insert(paths.project_home.clone());
            config.path.home.get_or_insert(paths.home.clone());
            config.path.rigup_home.get_or_insert(paths.rigup_home.clone());
            Ok(())
        })?;
        Ok(())
    }

    fn phases(&self) -> Vec<Phase> {
        vec![
            Phase::new("init", "Initialize project"),
            Phase::new("configure", "Configure the environment"),
            Phase::new("info", "Display information about features"),
            Phase::new("activate", "Print the shell activation script"),
            Phase::new("deactivate", "Print the shell deactivation script"),
            Phase::new("run", "Print the command line of a binary"),
        ]
    }

    fn commands(&self) -> Vec<Rc<dyn Command>> {
        [
            ("configure", "Configure the environment"),
            ("info", "List enabled features and their effective configuration"),
            ("activate", "Write a shell script to be executed to activate environment"),
            ("deactivate", "Write a shell script to be executed to deactivate environment"),
            ("run", "Display the command line to run a binary"),
        ]
        .into_iter()
        .map(|(name, description)| {
            Rc::new(PhaseCommand::new(name, description, ["init", name])) as Rc<dyn Command>
        })
        .collect()
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(ListFeaturesAction)]
    }
}

/// Prints every enabled feature with its resolved configuration.
pub struct ListFeaturesAction;

impl RegistryObject for ListFeaturesAction {
    fn name(&self) -> &str {
        "core:list-features"
    }
}

impl Action for ListFeaturesAction {
    fn description(&self) -> String {
        "Display all features and their effective configuration".into()
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:info".into()
    }

    fn execute(&self, engine: &Engine, _args: &EventArgs) -> RigupResult<Value> {
        let console = engine.console();
        console.print(SEPARATOR);
        for feature in engine.features().all() {
            if feature.disabled(engine) {
                continue;
            }
            console.print(&format!("name: {}", feature.name()));
            console.print(&format!("description: {}", feature.description()));

            if let Some(section) = engine.config().get(feature.name()) {
                let rendered = toml::to_string(&strip_nulls(&section))
                    .map_err(|e| RigupError::action(self.name(), e.to_string()))?;
                for line in rendered.lines() {
                    console.print(line);
                }
            }
            console.print(SEPARATOR);
        }
        Ok(Value::Null)
    }
}
