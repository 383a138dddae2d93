//! # rigup CLI
//!
//! ## Startup sequence
//!
//! 1. Load `.env`.
//! 2. Read the global flags given before the subcommand and initialise
//!    logging from them.
//! 3. Build and bootstrap the engine (configuration, caches, features).
//! 4. Build the command tree from the registered commands and parse.
//! 5. Re-apply the log level, and rebuild the engine if a flag given after
//!    the subcommand changes how it is built.
//! 6. Dispatch; translate any [`CliError`] into a message and exit code.
//!
//! ## Exit codes
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! |  0   | Success                                   |
//! |  1   | Internal error, or recorded action errors |
//! |  2   | User / input error                        |
//! |  3   | Resource not found                        |
//! |  4   | Configuration error                       |

use std::{ffi::OsString, io::IsTerminal as _, process::ExitCode};

use clap::{ArgMatches, FromArgMatches};
use rigup_core::application::Engine;
use tracing::{debug, instrument};

use crate::{
    cli::{COMPLETIONS, GlobalArgs},
    config::load_engine,
    error::{CliError, CliResult},
    logging::{LogHandle, init_logging},
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // Silently ignored if .env doesn't exist.
    let _ = dotenvy::dotenv();

    let argv: Vec<OsString> = std::env::args_os().collect();
    let early = cli::early_globals(&argv);

    let logging = match init_logging(&early) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e}");
            return ExitCode::from(1);
        }
    };

    debug!(
        verbose = early.verbose,
        silent = early.silent,
        fail_fast = early.fail_fast,
        "CLI started"
    );

    let verbose = early.verbose > 0;
    match run(&argv, early, &logging) {
        Ok(code) => code,
        Err(e) => handle_error(e, verbose),
    }
}

enum Parsed {
    Matches(ArgMatches),
    /// Help, version or a usage error, already printed.
    Exit(ExitCode),
}

fn parse(engine: &Engine, argv: &[OsString]) -> Parsed {
    match cli::build(engine).try_get_matches_from(argv) {
        Ok(matches) => Parsed::Matches(matches),
        Err(e) => {
            let _ = e.print();
            Parsed::Exit(ExitCode::from(if e.use_stderr() { 2 } else { 0 }))
        }
    }
}

#[instrument(skip_all)]
fn run(argv: &[OsString], early: GlobalArgs, logging: &LogHandle) -> CliResult<ExitCode> {
    let mut engine = load_engine(&early)?;
    let mut matches = match parse(&engine, argv) {
        Parsed::Matches(m) => m,
        Parsed::Exit(code) => return Ok(code),
    };

    let globals = GlobalArgs::from_arg_matches(&matches).map_err(|e| CliError::InvalidInput {
        message: e.to_string(),
    })?;
    if let Err(e) = logging.apply(&globals) {
        debug!(error = %e, "Keeping the initial log level");
    }

    if !globals.same_engine(&early) {
        debug!("Rebuilding engine with flags given after the subcommand");
        engine = load_engine(&globals)?;
        matches = match parse(&engine, argv) {
            Parsed::Matches(m) => m,
            Parsed::Exit(code) => return Ok(code),
        };
    }

    let Some((name, sub)) = matches.subcommand() else {
        return Err(CliError::InvalidInput {
            message: "a command is required".into(),
        });
    };

    if name == COMPLETIONS {
        commands::completions::execute(cli::build(&engine), sub)?;
        return Ok(ExitCode::SUCCESS);
    }
    commands::execute(&engine, name, sub)
}

/// Translate a `CliError` into a user message and an appropriate exit code.
fn handle_error(err: CliError, verbose: bool) -> ExitCode {
    err.log();

    let msg = if std::io::stderr().is_terminal() {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}
