//! CLI argument definitions.
//!
//! Subcommands are not known at compile time: every command a loaded
//! feature registers becomes one, so the tree is built with the clap
//! builder API from the engine's command registry. Global flags use the
//! derive API and are attached to the root.

use std::ffi::OsString;

use clap::{Arg, ArgAction, ArgMatches, Args, Command, FromArgMatches, value_parser};
use rigup_core::{
    application::{Command as EngineCommand, Engine},
    domain::{CommandArgs, CommandOption, OptionKind, RegistryObject},
};

pub mod global;
pub use global::GlobalArgs;

/// Built-in subcommand that does not go through the engine.
pub const COMPLETIONS: &str = "completions";

/// Trailing arguments of every engine command.
pub const UNKNOWN_ARGS: &str = "unknown_args";

/// Root command with global flags only.
pub fn root() -> Command {
    let cmd = Command::new("rigup")
        .bin_name("rigup")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Bootstrap and configure development environments")
        .long_about(
            "rigup loads the features of a project, resolves their configuration \
             and runs commands as sequences of phases.",
        )
        .after_help(
            "EXAMPLES:\n\
            \x20 rigup configure\n\
            \x20 eval \"$(rigup activate)\"\n\
            \x20 rigup run psql -U app\n\
            \x20 rigup completions bash > ~/.local/share/bash-completion/completions/rigup",
        );
    GlobalArgs::augment_args(cmd)
}

/// Global flags given before the subcommand.
///
/// They are needed to build the engine, which is needed to build the full
/// command tree; anything unparseable here is left for the full parse.
pub fn early_globals<I, T>(argv: I) -> GlobalArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    root()
        .ignore_errors(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .allow_external_subcommands(true)
        .try_get_matches_from(argv)
        .ok()
        .and_then(|m| GlobalArgs::from_arg_matches(&m).ok())
        .unwrap_or_default()
}

/// The full tree for `engine`.
pub fn build(engine: &Engine) -> Command {
    let mut cmd = root().subcommand_required(true).arg_required_else_help(true);
    for command in engine.commands().all() {
        cmd = cmd.subcommand(subcommand(command.as_ref()));
    }
    cmd.subcommand(
        Command::new(COMPLETIONS)
            .about("Generate shell completions")
            .arg(
                Arg::new("shell")
                    .required(true)
                    .value_parser(value_parser!(clap_complete::Shell))
                    .help("Shell to generate completions for"),
            ),
    )
}

fn subcommand(command: &dyn EngineCommand) -> Command {
    let mut sub = Command::new(command.name().to_owned()).about(command.description().to_owned());
    for option in command.options() {
        sub = sub.arg(option_arg(&option));
    }
    sub.arg(
        Arg::new(UNKNOWN_ARGS)
            .value_name("ARGS")
            .num_args(0..)
            .trailing_var_arg(true)
            .allow_hyphen_values(true)
            .help("Arguments passed through to the command"),
    )
}

fn option_arg(option: &CommandOption) -> Arg {
    let mut arg = Arg::new(option.name.clone())
        .long(option.name.clone())
        .help(option.help.clone());
    if let Some(short) = option.short {
        arg = arg.short(short);
    }
    match option.kind {
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
        OptionKind::Value => arg.action(ArgAction::Set).num_args(1),
    }
}

/// Arguments of `command` as parsed into `matches`.
pub fn command_args(command: &dyn EngineCommand, matches: &ArgMatches) -> CommandArgs {
    let mut args = CommandArgs::new();
    for option in command.options() {
        args = match option.kind {
            OptionKind::Flag => args.option(&option.name, matches.get_flag(&option.name)),
            OptionKind::Value => match matches.get_one::<String>(&option.name) {
                Some(value) => args.option(&option.name, value.clone()),
                None => args,
            },
        };
    }
    if let Some(unknown) = matches.get_many::<String>(UNKNOWN_ARGS) {
        args = args.unknown(unknown.cloned());
    }
    args
}
