//! # Action binding runners.
//!
//! One [`BindingRunner`] is subscribed to the bus for every (action, event,
//! method) binding. The runner owns the failure policy:
//!
//! - `fail_fast = true`: the action's error propagates and aborts the
//!   command.
//! - `fail_fast = false`: the error is recorded in the execution context
//!   with the full invocation path, logged once, and the runner returns
//!   `Null` so remaining handlers still run.
//!
//! A binding may carry a processor. It receives the triggering payload and
//! returns the arguments the action is invoked with, or `None` to skip it.

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error, instrument, trace};

use crate::{
    application::{Engine, bus::EventHandler, plugin::Action},
    domain::{EventArgs, EventBinding, InvocationFrame, Processor},
    error::RigupResult,
};

const DEFAULT_METHOD: &str = "execute";

pub struct BindingRunner {
    action: Rc<dyn Action>,
    event: String,
    method: Option<String>,
    processor: Option<Processor>,
    fail_fast: bool,
}

impl BindingRunner {
    pub fn new(action: Rc<dyn Action>, binding: EventBinding, fail_fast: bool) -> Self {
        Self {
            action,
            event: binding.event,
            method: binding.method,
            processor: binding.processor,
            fail_fast,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    fn method(&self) -> &str {
        self.method.as_deref().unwrap_or(DEFAULT_METHOD)
    }

    fn invoke(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        match &self.method {
            None => self.action.execute(engine, args),
            Some(method) => self.action.call(method, engine, args),
        }
    }

    /// Invoke the action for one emission.
    pub fn run(&self, engine: &Engine, triggering: &EventArgs) -> RigupResult<Value> {
        let processed;
        let args = match &self.processor {
            None => triggering,
            Some(processor) => match processor(triggering) {
                Some(args) => {
                    processed = args;
                    &processed
                }
                None => {
                    trace!(
                        event = %self.event,
                        action = self.action.name(),
                        "Processor skipped invocation"
                    );
                    return Ok(Value::Null);
                }
            },
        };

        engine.context_mut().push_frame(InvocationFrame::new(
            &self.event,
            self.action.name(),
            self.method(),
            args,
        ));
        // The context borrow must not be held while the action runs.
        let result = self.invoke(engine, args);

        let outcome = match result {
            Ok(value) => Ok(value),
            Err(err) if self.fail_fast => Err(err),
            Err(err) => {
                let mut context = engine.context_mut();
                let failure = context.record(err);
                error!("{failure}");
                Ok(Value::Null)
            }
        };

        engine.context_mut().pop_frame();
        outcome
    }
}

impl EventHandler for BindingRunner {
    fn handle(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        self.run(engine, args)
    }

    fn describe(&self) -> String {
        format!("{}.{}", self.action.name(), self.method())
    }
}

impl Engine {
    /// Subscribe every registered action to the bus.
    ///
    /// Actions are ordered by ascending `order`; the sort is stable, so ties
    /// keep registration order, which follows feature resolution order.
    #[instrument(skip_all, fields(fail_fast = fail_fast))]
    pub fn register_actions_in_event_bus(&mut self, fail_fast: bool) -> RigupResult<usize> {
        let mut actions = self.actions.all();
        actions.sort_by_key(|action| action.order());

        let mut bound = 0;
        for action in actions {
            for binding in action.event_bindings().normalize() {
                debug!(
                    action = action.name(),
                    event = %binding.event,
                    method = binding.method.as_deref().unwrap_or(DEFAULT_METHOD),
                    "Binding action"
                );
                let event = binding.event.clone();
                let runner = BindingRunner::new(Rc::clone(&action), binding, fail_fast);
                self.bus.on(event, Rc::new(runner));
                bound += 1;
            }
        }

        Ok(bound)
    }
}
