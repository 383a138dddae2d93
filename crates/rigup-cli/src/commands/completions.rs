//! Shell completion generation.

use std::io::Write;

use clap::{ArgMatches, Command};
use clap_complete::{Shell, generate};

use crate::error::{CliError, CliResult};

pub fn execute(mut cmd: Command, matches: &ArgMatches) -> CliResult<()> {
    let Some(shell) = matches.get_one::<Shell>("shell").copied() else {
        return Err(CliError::InvalidInput {
            message: "a shell is required".into(),
        });
    };

    let mut buffer = Vec::new();
    generate(shell, &mut cmd, "rigup", &mut buffer);
    std::io::stdout()
        .write_all(&buffer)
        .map_err(|source| CliError::Io {
            message: "writing completions".into(),
            source,
        })
}
