//! Layered configuration store.
//!
//! Files are read from the tool home, the user home and the project home,
//! in that order, each as `rigup.toml` then `rigup.local.toml`. Later files
//! win; tables merge recursively. Environment overrides come last.

mod error;
mod layered;
mod overrides;

pub use error::ConfigLoadError;
pub use layered::{ConfigOptions, LayeredConfig};
pub use overrides::apply_env_overrides;

/// Base names of configuration files, lowest priority first.
pub const CONFIG_BASENAMES: [&str; 2] = ["rigup", "rigup.local"];

/// Default environment prefix.
pub const ENV_PREFIX: &str = "RIGUP";
