//! Application ports (traits) for external dependencies.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by the engine, implemented by adapters
//!   - `ConfigStore`: Merged configuration tree
//!   - `Cache`: Namespaced key/value stores
//!   - `FeatureDiscovery`: Externally supplied features
//!   - `Console`: Action output
//!
//! - **Plugin contracts** (`Feature`, `Action`, `Command`) live in
//!   `crate::application::plugin`.

pub mod output;

pub use output::{Cache, ConfigPaths, ConfigStore, Console, FeatureDiscovery};

#[cfg(test)]
pub use output::MockConsole;
