//! Application layer for rigup.
//!
//! This layer contains:
//! - **Engine**: registries, bus and execution context, plus the startup
//!   and command operations split across `resolver`, `lifecycle`, `runner`
//!   and `pipeline`
//! - **Plugin contracts**: `Feature`, `Action`, `Command`
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Pure data and rules live in `crate::domain`.

pub mod bus;
pub mod context;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod plugin;
pub mod ports;
pub mod resolver;
pub mod runner;
pub mod settings;

pub use bus::{EventBus, EventHandler, FnHandler};
pub use context::{ExecutionContext, RecordedFailure};
pub use engine::Engine;
pub use error::ApplicationError;
pub use plugin::{Action, Command, Feature, PhaseCommand};
pub use resolver::{DEPENDENCIES_KEY, FeatureGraph};
pub use runner::BindingRunner;
pub use settings::resolve_section;

// Re-export port traits (for adapter implementation)
pub use ports::{Cache, ConfigPaths, ConfigStore, Console, FeatureDiscovery};
