//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use rigup_core::{
    application::{Action, Command, Engine, Feature, PhaseCommand},
    domain::{CommandArgs, Dependency, EventArgs, EventBindings, Phase, RegistryObject},
    error::{RigupError, RigupResult},
    testing::{MemoryConfig, quiet_engine},
};
use serde_json::Value;

pub use rigup_core::testing::FixedDiscovery;

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn engine(config: Value) -> Engine {
    quiet_engine(MemoryConfig::with(config))
}

/// What a scripted action does when invoked.
#[derive(Clone)]
pub enum Behaviour {
    Succeed,
    Fail(&'static str),
    Emit(&'static str),
    /// Request a restart unless already restarted.
    RestartOnce,
    RestartAlways,
    /// Request a restart, then fail.
    RestartThenFail(&'static str),
}

pub struct ScriptedAction {
    pub name: String,
    pub bindings: fn(&str) -> EventBindings,
    pub event: String,
    pub order: i32,
    pub disabled: bool,
    pub behaviour: Behaviour,
    pub log: Log,
}

impl ScriptedAction {
    pub fn on(name: &str, event: &str, log: &Log) -> Self {
        Self {
            name: name.to_owned(),
            bindings: |event| EventBindings::from(event),
            event: event.to_owned(),
            order: 0,
            disabled: false,
            behaviour: Behaviour::Succeed,
            log: Rc::clone(log),
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Declare the binding as a one-element list instead of a bare name.
    pub fn as_list(mut self) -> Self {
        self.bindings = |event| EventBindings::from(vec![event]);
        self
    }

    pub fn rc(self) -> Rc<dyn Action> {
        Rc::new(self)
    }
}

impl RegistryObject for ScriptedAction {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Action for ScriptedAction {
    fn event_bindings(&self) -> EventBindings {
        (self.bindings)(&self.event)
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn disabled(&self, _engine: &Engine) -> bool {
        self.disabled
    }

    fn execute(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        self.log.borrow_mut().push(self.name.clone());
        match &self.behaviour {
            Behaviour::Succeed => Ok(Value::from(self.name.as_str())),
            Behaviour::Fail(message) => Err(RigupError::action(&self.name, *message)),
            Behaviour::Emit(event) => {
                engine.emit(event, &EventArgs::new().kwarg("from", self.name.as_str()))?;
                Ok(Value::Null)
            }
            Behaviour::RestartOnce if args.get("again").is_some() => Ok(Value::Null),
            Behaviour::RestartOnce | Behaviour::RestartAlways => {
                engine.request_restart(CommandArgs::new().option("again", true));
                Ok(Value::Null)
            }
            Behaviour::RestartThenFail(message) => {
                engine.request_restart(CommandArgs::new().option("again", true));
                Err(RigupError::action(&self.name, *message))
            }
        }
    }
}

/// Feature whose hooks append to a shared log.
pub struct ScriptedFeature {
    pub name: String,
    pub dependencies: Vec<Dependency>,
    pub phases: Vec<&'static str>,
    pub commands: Vec<(&'static str, Vec<&'static str>)>,
    pub actions: Vec<Rc<dyn Action>>,
    pub after_load_error: Option<&'static str>,
    pub log: Log,
}

impl ScriptedFeature {
    pub fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_owned(),
            dependencies: Vec::new(),
            phases: Vec::new(),
            commands: Vec::new(),
            actions: Vec::new(),
            after_load_error: None,
            log: Rc::clone(log),
        }
    }

    pub fn depends_on(mut self, dependency: &str) -> Self {
        self.dependencies.push(dependency.parse().unwrap());
        self
    }

    pub fn phase(mut self, phase: &'static str) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn command(mut self, name: &'static str, phases: Vec<&'static str>) -> Self {
        self.commands.push((name, phases));
        self
    }

    pub fn action(mut self, action: Rc<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn failing_after_load(mut self, message: &'static str) -> Self {
        self.after_load_error = Some(message);
        self
    }

    pub fn rc(self) -> Rc<dyn Feature> {
        Rc::new(self)
    }
}

impl RegistryObject for ScriptedFeature {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Feature for ScriptedFeature {
    fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.clone()
    }

    fn before_load(&self, _engine: &Engine) -> RigupResult<()> {
        self.log
            .borrow_mut()
            .push(format!("{}:before_load", self.name));
        Ok(())
    }

    fn configure(&self, _engine: &Engine) -> RigupResult<()> {
        self.log.borrow_mut().push(format!("{}:configure", self.name));
        Ok(())
    }

    fn phases(&self) -> Vec<Phase> {
        self.phases.iter().map(|p| Phase::new(*p, "")).collect()
    }

    fn commands(&self) -> Vec<Rc<dyn Command>> {
        self.commands
            .iter()
            .map(|(name, phases)| {
                Rc::new(PhaseCommand::new(*name, "", phases.iter().copied())) as Rc<dyn Command>
            })
            .collect()
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        self.actions.clone()
    }

    fn after_load(&self, _engine: &Engine) -> RigupResult<()> {
        self.log.borrow_mut().push(format!("{}:after_load", self.name));
        match self.after_load_error {
            Some(message) => Err(RigupError::Configuration {
                message: message.to_owned(),
            }),
            None => Ok(()),
        }
    }
}
