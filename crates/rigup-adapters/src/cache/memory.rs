use std::{cell::RefCell, collections::HashMap};

use rigup_core::{application::ports::Cache, error::RigupResult};
use serde_json::Value;

/// Per-process cache; `flush` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_owned(), value);
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn flush(&self) -> RigupResult<()> {
        Ok(())
    }
}
