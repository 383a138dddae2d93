//! Core domain layer for rigup.
//!
//! Pure data and rules with no I/O: registries, dependency edges, event
//! payloads and bindings, phases and command arguments, and the errors
//! raised while assembling them.
//!
//! Everything that needs the running engine (plugin traits, the bus, the
//! runners) lives in `crate::application`.
pub mod dependency;
pub mod error;
pub mod event;
pub mod frame;
pub mod objects;
pub mod pipeline;
pub mod registry;
pub mod value_path;

pub use dependency::{Dependency, OPTIONAL_MARKER};
pub use error::{DomainError, ErrorCategory};
pub use event::{EventArgs, EventBinding, EventBindings, Processor};
pub use frame::InvocationFrame;
pub use objects::{Binary, Service};
pub use pipeline::{
    CommandArgs, CommandOption, CommandOutcome, OptionKind, PHASE_EVENT_PREFIX, Phase,
};
pub use registry::{Registry, RegistryObject};
