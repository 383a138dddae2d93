//! `run`: project binaries declared in configuration.

use std::{collections::BTreeMap, path::PathBuf, rc::Rc};

use rigup_core::{
    application::{Action, Engine, Feature, resolve_section},
    domain::{Binary, Dependency, EventArgs, EventBindings, RegistryObject},
    error::{RigupError, RigupResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::support::shell_quote;

pub const NAME: &str = "run";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub binaries: BTreeMap<String, BinaryConfig>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinaryConfig {
    pub command: Vec<String>,
    pub workdir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunFeature;

impl RegistryObject for RunFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for RunFeature {
    fn description(&self) -> &str {
        "Run binaries declared by features"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::required("core")]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        resolve_section(engine, NAME, |config: &mut RunConfig| {
            if let Some((name, _)) = config.binaries.iter().find(|(_, b)| b.command.is_empty()) {
                return Err(RigupError::Configuration {
                    message: format!("run.binaries.{name}.command must not be empty"),
                });
            }
            Ok(())
        })
        .map(|_: RunConfig| ())
    }

    fn binaries(&self, engine: &Engine) -> Vec<Binary> {
        let config: RunConfig = engine
            .config()
            .get(NAME)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        config
            .binaries
            .into_iter()
            .map(|(name, b)| {
                let binary = Binary::new(name, b.command);
                match b.workdir {
                    Some(workdir) => binary.with_workdir(workdir),
                    None => binary,
                }
            })
            .collect()
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(PrintCommandAction)]
    }
}

/// Prints the command line of `rigup run <binary> [args...]`.
pub struct PrintCommandAction;

impl RegistryObject for PrintCommandAction {
    fn name(&self) -> &str {
        "run:print"
    }
}

impl Action for PrintCommandAction {
    fn description(&self) -> String {
        "Print the command line of a binary".into()
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:run".into()
    }

    fn execute(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        let unknown: Vec<String> = args
            .get("unknown_args")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let Some((name, extra)) = unknown.split_first() else {
            return Err(RigupError::action(self.name(), "no binary name given"));
        };
        let binary = engine.binaries().get(name).ok_or_else(|| {
            let known = engine.binaries().names().join(", ");
            RigupError::action(
                self.name(),
                format!("binary '{name}' not found (available: {known})"),
            )
        })?;

        let line = command_line(&binary, extra);
        engine.console().print(&line);
        Ok(Value::from(line))
    }
}

fn command_line(binary: &Binary, extra: &[String]) -> String {
    let command = binary
        .command_line(extra)
        .iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ");
    match &binary.workdir {
        Some(workdir) => format!("(cd {} && {command})", shell_quote(&workdir.to_string_lossy())),
        None => command,
    }
}
