//! Engine construction from command-line flags.
//!
//! # Resolution order (highest priority first)
//!
//! 1. `--config FILE`
//! 2. `RIGUP_OVERRIDE_*` environment variables
//! 3. `rigup.local.toml`, then `rigup.toml`, from the project home, the
//!    user home and the tool home
//! 4. Feature defaults

use std::path::PathBuf;

use rigup_adapters::{BootstrapOptions, ConfigOptions, StaticDiscovery, build_engine};
use rigup_core::application::Engine;
use tracing::instrument;

use crate::{cli::GlobalArgs, error::CliResult, output::TerminalConsole};

/// Overrides the persistent cache directory.
const CACHE_DIR_VAR: &str = "RIGUP_CACHE_DIR";

/// Options for building the engine of this process.
pub fn bootstrap_options(args: &GlobalArgs) -> CliResult<BootstrapOptions> {
    let config = ConfigOptions::from_process()?.with_extra_file(args.config.clone());
    let cache_dir = config
        .env
        .get(CACHE_DIR_VAR)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);

    let options = BootstrapOptions::new(config).fail_fast(args.fail_fast);
    Ok(match cache_dir {
        Some(dir) => options.cache_dir(Some(dir)),
        None => options,
    })
}

/// Build a fully bootstrapped engine for `args`.
#[instrument(skip_all)]
pub fn load_engine(args: &GlobalArgs) -> CliResult<Engine> {
    let options = bootstrap_options(args)?;
    let engine = build_engine(
        options,
        Box::new(TerminalConsole::new(args)),
        &StaticDiscovery::new(),
    )?;
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_reach_the_options() {
        let args = GlobalArgs {
            fail_fast: true,
            config: Some(PathBuf::from("/tmp/extra.toml")),
            ..GlobalArgs::default()
        };
        let options = bootstrap_options(&args).unwrap();
        assert!(options.fail_fast);
        assert_eq!(
            options.config.extra_file,
            Some(PathBuf::from("/tmp/extra.toml"))
        );
    }
}
