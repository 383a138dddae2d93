//! Subcommand dispatch.

pub mod completions;

use std::process::ExitCode;

use clap::ArgMatches;
use rigup_core::application::Engine;
use tracing::instrument;

use crate::{
    cli,
    error::{CliError, CliResult},
};

/// Run the engine command `name` and flush caches.
///
/// Recorded action failures do not make this an error; they only turn the
/// exit status to 1.
#[instrument(skip(engine, matches))]
pub fn execute(engine: &Engine, name: &str, matches: &ArgMatches) -> CliResult<ExitCode> {
    let command = engine
        .commands()
        .get(name)
        .ok_or_else(|| CliError::InvalidInput {
            message: format!("unknown command '{name}'"),
        })?;

    let args = cli::command_args(command.as_ref(), matches);
    engine.execute_command(name, args)?;
    engine.flush_caches()?;

    Ok(ExitCode::from(engine.exit_code()))
}
