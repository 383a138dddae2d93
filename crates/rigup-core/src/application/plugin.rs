//! Plugin contracts: features, actions and commands.
//!
//! Every hook receives the [`Engine`] by shared reference. Engine state that
//! handlers mutate (configuration, caches, the execution context) uses
//! interior mutability, which is sound because execution is single-threaded.

use std::rc::Rc;

use serde_json::Value;

use crate::{
    application::{ApplicationError, Engine},
    domain::{
        Binary, CommandArgs, CommandOption, CommandOutcome, Dependency, EventArgs, EventBindings,
        Phase, RegistryObject, Service,
    },
    error::RigupResult,
};

/// A pluggable unit of functionality.
///
/// The feature name doubles as its configuration namespace. Lifecycle
/// hooks run once, breadth-first across all registered features:
/// `before_load` → `configure` → enable/disable → harvest → `after_load`.
pub trait Feature: RegistryObject {
    fn description(&self) -> &str {
        ""
    }

    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Mutate raw configuration before any feature resolves its own.
    fn before_load(&self, _engine: &Engine) -> RigupResult<()> {
        Ok(())
    }

    /// Resolve and validate this feature's configuration subtree.
    fn configure(&self, _engine: &Engine) -> RigupResult<()> {
        Ok(())
    }

    /// Resolved `<name>.disabled` flag.
    fn disabled(&self, engine: &Engine) -> bool {
        engine
            .config()
            .get(&format!("{}.disabled", self.name()))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn phases(&self) -> Vec<Phase> {
        Vec::new()
    }

    fn commands(&self) -> Vec<Rc<dyn Command>> {
        Vec::new()
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        Vec::new()
    }

    /// Called after `configure`, so binaries may come from configuration.
    fn binaries(&self, _engine: &Engine) -> Vec<Binary> {
        Vec::new()
    }

    fn services(&self, _engine: &Engine) -> Vec<Service> {
        Vec::new()
    }

    /// Final wiring once every enabled feature has been harvested.
    fn after_load(&self, _engine: &Engine) -> RigupResult<()> {
        Ok(())
    }
}

/// A unit of work bound to one or more events.
pub trait Action: RegistryObject {
    fn description(&self) -> String {
        self.name().to_owned()
    }

    fn event_bindings(&self) -> EventBindings;

    /// Lower runs first within an event.
    fn order(&self) -> i32 {
        0
    }

    fn disabled(&self, _engine: &Engine) -> bool {
        false
    }

    /// Default entry point.
    fn execute(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value>;

    /// Entry point for bindings that name a method.
    fn call(&self, method: &str, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        match method {
            "execute" => self.execute(engine, args),
            _ => Err(ApplicationError::UnknownMethod {
                action: self.name().to_owned(),
                method: method.to_owned(),
            }
            .into()),
        }
    }
}

/// A named entry point that fires an ordered sequence of phases.
pub trait Command: RegistryObject {
    fn description(&self) -> &str {
        ""
    }

    fn phases(&self) -> &[String];

    fn options(&self) -> Vec<CommandOption> {
        Vec::new()
    }

    fn execute(&self, engine: &Engine, args: &CommandArgs) -> RigupResult<CommandOutcome> {
        engine.run_phases(self.phases(), args)
    }
}

/// The common command shape: a fixed list of phases plus options.
#[derive(Debug, Clone)]
pub struct PhaseCommand {
    name: String,
    description: String,
    phases: Vec<String>,
    options: Vec<CommandOption>,
}

impl PhaseCommand {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        phases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            phases: phases.into_iter().map(Into::into).collect(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

impl RegistryObject for PhaseCommand {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Command for PhaseCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn phases(&self) -> &[String] {
        &self.phases
    }

    fn options(&self) -> Vec<CommandOption> {
        self.options.clone()
    }
}
