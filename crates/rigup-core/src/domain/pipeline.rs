//! Phases, command options and command outcomes.

use serde_json::{Map, Value};

use super::{EventArgs, RegistryObject};

/// Prefix of the event fired for a phase.
pub const PHASE_EVENT_PREFIX: &str = "phase:";

/// A named pipeline stage. Firing it emits `phase:<name>` on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    name: String,
    description: String,
}

impl Phase {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn event_name(&self) -> String {
        format!("{PHASE_EVENT_PREFIX}{}", self.name)
    }
}

impl RegistryObject for Phase {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Whether a command option takes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Flag,
    Value,
}

/// A command-line option a command declares; the CLI turns it into a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    pub name: String,
    pub short: Option<char>,
    pub help: String,
    pub kind: OptionKind,
}

impl CommandOption {
    pub fn flag(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            help: help.into(),
            kind: OptionKind::Flag,
        }
    }

    pub fn value(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            help: help.into(),
            kind: OptionKind::Value,
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }
}

/// Parsed arguments of one command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    pub options: Map<String, Value>,
    /// Arguments the parser did not recognise, passed through verbatim.
    pub unknown: Vec<String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn unknown(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unknown.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn flag(&self, name: &str) -> bool {
        self.options
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Keyword arguments handed to every phase event of the command.
    pub fn to_event_args(&self) -> EventArgs {
        let mut args = EventArgs::new();
        args.kwargs = self.options.clone();
        if !self.unknown.is_empty() {
            args.kwargs.insert(
                "unknown_args".into(),
                Value::from(self.unknown.clone()),
            );
        }
        args
    }
}

/// Result of running a command once.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Completed,
    /// Run the command again with these arguments.
    RestartRequested(CommandArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_event_name_is_prefixed() {
        assert_eq!(Phase::new("configure", "").event_name(), "phase:configure");
    }

    #[test]
    fn command_args_become_kwargs() {
        let args = CommandArgs::new()
            .option("eject", true)
            .unknown(["psql", "-U"]);
        let event = args.to_event_args();
        assert_eq!(event.get("eject"), Some(&Value::Bool(true)));
        assert_eq!(
            event.get("unknown_args"),
            Some(&Value::from(vec!["psql", "-U"]))
        );
        assert!(event.args.is_empty());
    }

    #[test]
    fn missing_flag_is_false() {
        assert!(!CommandArgs::new().flag("eject"));
    }
}
