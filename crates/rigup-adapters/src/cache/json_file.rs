use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use rigup_core::{
    application::{ApplicationError, ports::Cache},
    error::RigupResult,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Cache persisted as one JSON document per namespace.
///
/// Entries are read when the cache is opened and written back on `flush`
/// when anything changed.
#[derive(Debug)]
pub struct JsonFileCache {
    namespace: String,
    path: PathBuf,
    entries: RefCell<BTreeMap<String, Value>>,
    dirty: Cell<bool>,
}

impl JsonFileCache {
    /// Open `<dir>/<name>.json`. An unreadable file starts an empty cache.
    pub fn open(dir: &Path, name: &str) -> Self {
        let path = dir.join(format!("{name}.json"));
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Discarding corrupt cache file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        Self {
            namespace: name.to_owned(),
            path,
            entries: RefCell::new(entries),
            dirty: Cell::new(false),
        }
    }

    /// Default directory for cache files.
    pub fn default_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "rigup", "rigup").map(|d| d.cache_dir().to_path_buf())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> ApplicationError {
        ApplicationError::CacheError {
            namespace: self.namespace.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Cache for JsonFileCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_owned(), value);
        self.dirty.set(true);
    }

    fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.dirty.set(true);
    }

    fn flush(&self) -> RigupResult<()> {
        if !self.dirty.get() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let raw = serde_json::to_string(&*self.entries.borrow()).map_err(|e| self.error(e))?;
        fs::write(&self.path, raw).map_err(|e| self.error(e))?;

        self.dirty.set(false);
        debug!(cache = %self.namespace, path = %self.path.display(), "Cache flushed");
        Ok(())
    }
}
