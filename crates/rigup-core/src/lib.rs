//! rigup Core - orchestration engine for development-environment features.
//!
//! This crate provides the domain and application layers of rigup,
//! following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            rigup-cli (CLI)              │
//! │   dynamic commands, logging, output     │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │                Engine                   │
//! │  resolve → load → bind → run command    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    Ports & plugin contracts (traits)    │
//! │ ConfigStore, Cache, Feature, Action ... │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    rigup-adapters (Infrastructure)      │
//! │ LayeredConfig, caches, builtin features │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rigup_core::prelude::*;
//!
//! # fn run(config: Box<dyn ConfigStore>, console: Box<dyn Console>,
//! #        builtins: Vec<std::rc::Rc<dyn Feature>>, discovery: &dyn FeatureDiscovery)
//! #        -> RigupResult<()> {
//! let mut engine = Engine::new(config, console);
//! engine.bootstrap(builtins, discovery, false)?;
//! engine.execute_command("configure", CommandArgs::new())?;
//! std::process::exit(engine.exit_code().into());
//! # }
//! ```

pub mod domain;

pub mod application;

pub mod error;

pub mod testing;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        Action, ApplicationError, Command, Engine, Feature, PhaseCommand, RecordedFailure,
        resolve_section,
        ports::{Cache, ConfigPaths, ConfigStore, Console, FeatureDiscovery},
    };
    pub use crate::domain::{
        Binary, CommandArgs, CommandOption, CommandOutcome, Dependency, EventArgs, EventBinding,
        EventBindings, OptionKind, Phase, RegistryObject, Service,
    };
    pub use crate::error::{RigupError, RigupResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
