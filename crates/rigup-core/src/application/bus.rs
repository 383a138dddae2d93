//! # Synchronous event bus.
//!
//! [`EventBus`] maps exact event names to ordered handler lists. Emission
//! runs every handler on the calling thread, in subscription order, and
//! collects their return values.
//!
//! ## Rules
//! - **Re-entrant**: a handler may emit further events; emission nests
//!   depth-first. The handler list is snapshotted before invocation, so the
//!   table is never borrowed while a handler runs.
//! - **No error isolation here**: a handler returning `Err` stops the
//!   emission. Isolation is the job of
//!   [`BindingRunner`](crate::application::runner::BindingRunner).
//! - **No wildcards**: names match exactly.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use serde_json::Value;
use tracing::trace;

use crate::{application::Engine, domain::EventArgs, error::RigupResult};

/// Something subscribable to an event.
pub trait EventHandler {
    fn handle(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value>;

    /// Label for logs.
    fn describe(&self) -> String;
}

/// Adapter turning a closure into an [`EventHandler`].
pub struct FnHandler<F> {
    label: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Engine, &EventArgs) -> RigupResult<Value>,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Engine, &EventArgs) -> RigupResult<Value>,
{
    fn handle(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        (self.f)(engine, args)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<String, Vec<Rc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `event`.
    pub fn on(&self, event: impl Into<String>, handler: Rc<dyn EventHandler>) {
        self.handlers
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(handler);
    }

    /// Subscribe a closure to `event`.
    pub fn on_fn<F>(&self, event: impl Into<String>, label: impl Into<String>, f: F)
    where
        F: Fn(&Engine, &EventArgs) -> RigupResult<Value> + 'static,
    {
        self.on(event, Rc::new(FnHandler::new(label, f)));
    }

    /// Invoke every handler bound to `event` and collect return values.
    pub fn emit(
        &self,
        engine: &Engine,
        event: &str,
        args: &EventArgs,
    ) -> RigupResult<Vec<Value>> {
        let handlers = self.handlers_for(event);
        trace!(event, handlers = handlers.len(), "Emitting event");

        let mut results = Vec::with_capacity(handlers.len());
        for handler in handlers {
            results.push(handler.handle(engine, args)?);
        }
        Ok(results)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.borrow().get(event).map_or(0, Vec::len)
    }

    /// Handler labels bound to `event`, in invocation order.
    pub fn describe(&self, event: &str) -> Vec<String> {
        self.handlers_for(event)
            .iter()
            .map(|h| h.describe())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().values().all(Vec::is_empty)
    }

    /// Remove every binding.
    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }

    fn handlers_for(&self, event: &str) -> Vec<Rc<dyn EventHandler>> {
        self.handlers
            .borrow()
            .get(event)
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        let mut events: Vec<_> = handlers.iter().map(|(k, v)| (k.clone(), v.len())).collect();
        events.sort();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}
