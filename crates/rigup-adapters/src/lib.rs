//! # rigup-adapters
//!
//! Infrastructure for the rigup engine: the layered configuration store,
//! cache backends, feature discovery, and the built-in features.
//!
//! [`bootstrap::build_engine`] wires all of it into a ready
//! [`rigup_core::application::Engine`].

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod features;

pub use bootstrap::{BootstrapOptions, build_engine, start_engine};
pub use cache::{JsonFileCache, MemoryCache};
pub use config::{ConfigLoadError, ConfigOptions, LayeredConfig};
pub use discovery::StaticDiscovery;
pub use features::builtin_features;
