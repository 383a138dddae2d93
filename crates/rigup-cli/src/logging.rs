//! Tracing subscriber initialisation.
//!
//! Only the CLI crate installs a subscriber; `rigup-core` and
//! `rigup-adapters` only *emit* spans and events.
//!
//! # Verbosity mapping
//!
//! | Flag(s)    | Filter level |
//! |------------|--------------|
//! | `--silent` | ERROR        |
//! | (none)     | INFO         |
//! | `-v`       | DEBUG        |
//! | `-vv`      | TRACE        |
//!
//! `RUST_LOG` overrides all of the above if set.
//!
//! The subscriber is installed from the flags seen before the subcommand,
//! then adjusted with [`LogHandle::apply`] once the full command tree has
//! been parsed.

use std::io::IsTerminal as _;

use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::cli::GlobalArgs;

/// Crates whose events are shown at the selected level.
const TARGETS: [&str; 3] = ["rigup", "rigup_core", "rigup_adapters"];

/// Handle to change the level after initialisation.
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Switch to the level selected by `args`. No-op when `RUST_LOG` is set.
    pub fn apply(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        if self.from_env {
            return Ok(());
        }
        self.handle
            .reload(filter_for(derive_level(args)))
            .map_err(|e| anyhow::anyhow!("Failed to change log level: {e}"))
    }
}

/// Initialise the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros fire.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<LogHandle> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (filter_for(derive_level(args)), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let use_ansi = !args.no_color && std::io::stderr().is_terminal();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(use_ansi)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise tracing: {e}"))?;

    Ok(LogHandle { handle, from_env })
}

fn filter_for(level: &str) -> EnvFilter {
    let directives = TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Translate the verbosity counter + silent flag to a level string.
fn derive_level(args: &GlobalArgs) -> &'static str {
    if args.silent {
        return "error";
    }
    match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
