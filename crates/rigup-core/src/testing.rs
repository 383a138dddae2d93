//! In-memory port implementations.
//!
//! Used by the engine's own tests and handy for embedding the engine
//! without files or a terminal.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::PathBuf,
    rc::Rc,
};

use serde_json::{Value, json};

use crate::{
    application::{
        Engine,
        ports::{Cache, ConfigPaths, ConfigStore, Console, FeatureDiscovery},
        plugin::Feature,
    },
    domain::value_path,
    error::RigupResult,
};

/// A JSON tree behind a `RefCell`.
///
/// The tree it was built with acts as its source: [`ConfigStore::reload`]
/// restores it.
#[derive(Debug)]
pub struct MemoryConfig {
    source: Value,
    data: RefCell<Value>,
}

impl MemoryConfig {
    pub fn with(data: Value) -> Self {
        Self {
            data: RefCell::new(data.clone()),
            source: data,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::with(json!({}))
    }
}

impl ConfigStore for MemoryConfig {
    fn get(&self, path: &str) -> Option<Value> {
        value_path::get_path(&self.data.borrow(), path).cloned()
    }

    fn set(&self, path: &str, value: Value) {
        value_path::set_path(&mut self.data.borrow_mut(), path, value);
    }

    fn data(&self) -> Value {
        self.data.borrow().clone()
    }

    fn paths(&self) -> ConfigPaths {
        ConfigPaths {
            rigup_home: PathBuf::from("/opt/rigup"),
            home: PathBuf::from("/home/dev/.rigup"),
            project_home: PathBuf::from("/work/app"),
        }
    }

    fn env_prefix(&self) -> &str {
        "RIGUP"
    }

    fn apply_overrides(&self, _namespace: &str, value: Value) -> Value {
        value
    }

    fn reload(&self) -> RigupResult<()> {
        *self.data.borrow_mut() = self.source.clone();
        Ok(())
    }

    fn reset(&self) {
        *self.data.borrow_mut() = json!({});
    }
}

/// Console that swallows output.
pub struct NullConsole;

impl Console for NullConsole {
    fn print(&self, _line: &str) {}

    fn success(&self, _line: &str) {}

    fn warning(&self, _line: &str) {}
}

/// Memory cache that counts flushes.
#[derive(Default)]
pub struct RecordingCache {
    data: RefCell<HashMap<String, Value>>,
    flushes: Cell<usize>,
}

impl RecordingCache {
    pub fn flushes(&self) -> usize {
        self.flushes.get()
    }
}

impl Cache for RecordingCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.data.borrow_mut().insert(key.to_owned(), value);
    }

    fn clear(&self) {
        self.data.borrow_mut().clear();
    }

    fn flush(&self) -> RigupResult<()> {
        self.flushes.set(self.flushes.get() + 1);
        Ok(())
    }
}

/// Discovery returning a fixed list.
#[derive(Default)]
pub struct FixedDiscovery(pub Vec<Rc<dyn Feature>>);

impl FeatureDiscovery for FixedDiscovery {
    fn discover(&self) -> Vec<Rc<dyn Feature>> {
        self.0.clone()
    }
}

/// Engine over a [`MemoryConfig`] and a [`NullConsole`].
pub fn quiet_engine(config: MemoryConfig) -> Engine {
    Engine::new(Box::new(config), Box::new(NullConsole))
}
