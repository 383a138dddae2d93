//! Event payloads and action-to-event bindings.

use std::{fmt, rc::Rc};

use serde_json::{Map, Value};

/// Positional and keyword arguments carried by an emitted event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventArgs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl EventArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).and_then(Value::as_str)
    }

    /// Compact `a, b, key=value` rendering used in failure reports.
    pub fn summary(&self) -> String {
        let mut kwargs: Vec<_> = self.kwargs.iter().collect();
        kwargs.sort_by(|a, b| a.0.cmp(b.0));

        self.args
            .iter()
            .map(display_value)
            .chain(
                kwargs
                    .into_iter()
                    .map(|(k, v)| format!("{k}={}", display_value(v))),
            )
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".into(),
        other => other.to_string(),
    }
}

/// Maps the payload of a triggering event to the arguments of the bound
/// handler. `None` means the handler is not invoked for this payload.
pub type Processor = Rc<dyn Fn(&EventArgs) -> Option<EventArgs>>;

/// One (event, method, processor) binding of an action.
#[derive(Clone)]
pub struct EventBinding {
    pub event: String,
    /// Alternate entry point; `None` means the action's `execute`.
    pub method: Option<String>,
    pub processor: Option<Processor>,
}

impl EventBinding {
    pub fn on(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            method: None,
            processor: None,
        }
    }

    /// Route this binding to a named method instead of `execute`.
    pub fn call(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Transform (or filter) the triggering payload before invocation.
    pub fn process<F>(mut self, processor: F) -> Self
    where
        F: Fn(&EventArgs) -> Option<EventArgs> + 'static,
    {
        self.processor = Some(Rc::new(processor));
        self
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("event", &self.event)
            .field("method", &self.method)
            .field("processor", &self.processor.is_some())
            .finish()
    }
}

impl PartialEq for EventBinding {
    fn eq(&self, other: &Self) -> bool {
        self.event == other.event
            && self.method == other.method
            && match (&self.processor, &other.processor) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

/// The shapes an action may declare its bindings in.
#[derive(Debug, Clone)]
pub enum EventBindings {
    /// A single event, default method.
    Single(String),
    /// Several events, default method each.
    Events(Vec<String>),
    /// Fully specified bindings.
    Bindings(Vec<EventBinding>),
}

impl EventBindings {
    /// Flatten into a uniform list of bindings.
    pub fn normalize(self) -> Vec<EventBinding> {
        match self {
            Self::Single(event) => vec![EventBinding::on(event)],
            Self::Events(events) => events.into_iter().map(EventBinding::on).collect(),
            Self::Bindings(bindings) => bindings,
        }
    }
}

impl From<&str> for EventBindings {
    fn from(event: &str) -> Self {
        Self::Single(event.to_owned())
    }
}

impl From<Vec<&str>> for EventBindings {
    fn from(events: Vec<&str>) -> Self {
        Self::Events(events.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<EventBinding>> for EventBindings {
    fn from(bindings: Vec<EventBinding>) -> Self {
        Self::Bindings(bindings)
    }
}
