//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the engine needs from the outside world.
//! The `rigup-adapters` crate provides implementations.

use std::{path::PathBuf, rc::Rc};

use serde_json::Value;

use crate::application::plugin::Feature;
use crate::error::RigupResult;

/// Directories configuration is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Installation directory of the tool itself.
    pub rigup_home: PathBuf,
    /// User-wide directory (`~/.rigup`).
    pub home: PathBuf,
    /// Root of the project being bootstrapped.
    pub project_home: PathBuf,
}

/// Port for the merged, hierarchical configuration.
///
/// Implemented by:
/// - `rigup_adapters::config::LayeredConfig` (files + environment)
///
/// Paths are dotted (`docker.compose.project_name`). The engine only reads
/// enablement flags and dependency overrides; features own their namespace.
pub trait ConfigStore {
    fn get(&self, path: &str) -> Option<Value>;

    fn set(&self, path: &str, value: Value);

    /// Snapshot of the whole tree.
    fn data(&self) -> Value;

    fn paths(&self) -> ConfigPaths;

    /// Prefix used for exported environment variables (`RIGUP`).
    fn env_prefix(&self) -> &str;

    /// Apply `<PREFIX>_OVERRIDE_<NAMESPACE>_...` environment overrides to a
    /// resolved subtree.
    fn apply_overrides(&self, namespace: &str, value: Value) -> Value;

    /// Re-read the backing sources, discarding in-memory changes.
    fn reload(&self) -> RigupResult<()>;

    /// Drop all loaded data.
    fn reset(&self);
}

/// Port for a namespaced key/value cache.
///
/// Implemented by:
/// - `rigup_adapters::cache::MemoryCache` (per-process)
/// - `rigup_adapters::cache::JsonFileCache` (persisted on flush)
pub trait Cache {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    fn clear(&self);

    /// Persist pending writes.
    fn flush(&self) -> RigupResult<()>;
}

/// Port for externally supplied features.
///
/// Implemented by:
/// - `rigup_adapters::discovery::StaticDiscovery`
pub trait FeatureDiscovery {
    /// Instantiate every discoverable feature.
    fn discover(&self) -> Vec<Rc<dyn Feature>>;
}

/// Port for user-facing output produced by actions.
#[cfg_attr(test, mockall::automock)]
pub trait Console {
    fn print(&self, line: &str);

    fn success(&self, line: &str);

    fn warning(&self, line: &str);
}
