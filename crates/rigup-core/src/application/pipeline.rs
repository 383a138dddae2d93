//! Command execution: phases in order, one restart at most.

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{ApplicationError, Engine},
    domain::{CommandArgs, CommandOutcome, PHASE_EVENT_PREFIX},
    error::RigupResult,
};

impl Engine {
    /// Run the named command.
    ///
    /// A command may ask to be re-run once with new arguments; a second
    /// request during the retry fails with [`ApplicationError::RestartLoop`].
    /// Recorded action failures do not make this return `Err`; read them
    /// with [`Engine::failures`].
    #[instrument(skip(self, args), fields(command = name))]
    pub fn execute_command(&self, name: &str, args: CommandArgs) -> RigupResult<()> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| ApplicationError::UnknownCommand {
                name: name.to_owned(),
            })?;

        self.discard_restart();
        info!("Running command");

        let outcome = command.execute(self, &args);
        let outcome = match outcome {
            Ok(CommandOutcome::RestartRequested(restart_args)) => {
                info!("Restarting command with new arguments");
                match command.execute(self, &restart_args) {
                    Ok(CommandOutcome::RestartRequested(_)) => {
                        Err(ApplicationError::RestartLoop {
                            command: name.to_owned(),
                        }
                        .into())
                    }
                    other => other.map(|_| ()),
                }
            }
            other => other.map(|_| ()),
        };

        if outcome.is_err() {
            self.discard_restart();
        }

        let failures = self.context().failures().len();
        if failures > 0 {
            warn!(failures, "Command completed with errors");
        }
        outcome
    }

    /// Fire each phase in order, passing `args` as keyword arguments.
    ///
    /// Stops early and returns [`CommandOutcome::RestartRequested`] when a
    /// handler requested a restart during a phase.
    pub fn run_phases(
        &self,
        phases: &[String],
        args: &CommandArgs,
    ) -> RigupResult<CommandOutcome> {
        let payload = args.to_event_args();

        for name in phases {
            if !self.phases.has(name) {
                return Err(ApplicationError::UnknownPhase { name: name.clone() }.into());
            }

            let event = format!("{PHASE_EVENT_PREFIX}{name}");
            debug!(phase = %name, handlers = self.bus.handler_count(&event), "Firing phase");
            self.emit(&event, &payload)?;

            let restart = self.context_mut().take_restart();
            if let Some(restart_args) = restart {
                debug!(phase = %name, "Phase requested a restart");
                return Ok(CommandOutcome::RestartRequested(restart_args));
            }
        }

        Ok(CommandOutcome::Completed)
    }

    /// Drop a restart request left behind by an aborted run.
    fn discard_restart(&self) {
        if self.context_mut().take_restart().is_some() {
            debug!("Discarding stale restart request");
        }
    }
}
