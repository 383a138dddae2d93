//! Terminal output for actions.

use std::io::IsTerminal;

use console::Term;
use owo_colors::OwoColorize;
use rigup_core::application::ports::Console;
use tracing::debug;

use crate::cli::GlobalArgs;

/// [`Console`] writing to stdout.
///
/// Plain lines are always written: they are the output of commands such as
/// `activate` and are meant to be captured. Decorated lines respect
/// `--silent` and colour settings.
pub struct TerminalConsole {
    term: Term,
    color: bool,
    silent: bool,
}

impl TerminalConsole {
    pub fn new(args: &GlobalArgs) -> Self {
        Self {
            term: Term::stdout(),
            color: !args.no_color && std::io::stdout().is_terminal(),
            silent: args.silent,
        }
    }

    fn write(&self, line: &str) {
        if let Err(e) = self.term.write_line(line) {
            debug!(error = %e, "Failed to write to stdout");
        }
    }

    fn decorated(&self, symbol: &str, line: &str, paint: fn(&str) -> String) -> String {
        if self.color {
            paint(&format!("{symbol} {line}"))
        } else {
            format!("{symbol} {line}")
        }
    }
}

impl Console for TerminalConsole {
    fn print(&self, line: &str) {
        self.write(line);
    }

    /// `✓ <line>`
    fn success(&self, line: &str) {
        if self.silent {
            return;
        }
        self.write(&self.decorated("\u{2713}", line, |s| s.green().to_string()));
    }

    /// `⚠ <line>`
    fn warning(&self, line: &str) {
        if self.silent {
            return;
        }
        self.write(&self.decorated("\u{26a0}", line, |s| s.yellow().to_string()));
    }
}
