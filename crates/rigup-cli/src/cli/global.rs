//! Global arguments that apply to every subcommand.
//!
//! Declared here and attached to the root command so that `-v`, `-s`, etc.
//! are available on any invocation without repetition.

use clap::Args;
use std::path::PathBuf;

/// Global arguments for all commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    ///
    /// Pass once for DEBUG (`-v`), twice for TRACE (`-vv`). Conflicts with
    /// `--silent`.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v, -vv)",
        long_help = "Increase logging verbosity:
    (none)  - Info level
    -v      - Debug level (detailed diagnostics)
    -vv     - Trace level (very verbose)"
    )]
    pub verbose: u8,

    /// Only log critical errors.
    #[arg(
        short = 's',
        long = "silent",
        global = true,
        conflicts_with = "verbose",
        help = "Only log errors"
    )]
    pub silent: bool,

    /// Disable ANSI colour codes.
    ///
    /// Automatically honoured when `NO_COLOR` is set in the environment
    /// (see <https://no-color.org>).
    #[arg(
        long = "no-color",
        global = true,
        env = "NO_COLOR",
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Extra configuration file, merged over the discovered ones.
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        value_name = "FILE",
        help = "Additional configuration file"
    )]
    pub config: Option<PathBuf>,

    /// Stop at the first failing action.
    #[arg(
        long = "fail-fast",
        global = true,
        help = "Abort the command on the first action failure"
    )]
    pub fail_fast: bool,
}

impl GlobalArgs {
    /// Whether two argument sets build the same engine.
    pub fn same_engine(&self, other: &Self) -> bool {
        self.config == other.config && self.fail_fast == other.fail_fast
    }
}
