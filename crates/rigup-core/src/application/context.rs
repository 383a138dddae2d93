//! Per-run execution state: the handler call path, recorded failures and a
//! pending restart request.

use std::fmt;

use crate::{
    domain::{CommandArgs, InvocationFrame},
    error::RigupError,
};

/// An action error recorded instead of aborting the command.
#[derive(Debug, Clone)]
pub struct RecordedFailure {
    /// Outermost invocation first.
    pub frames: Vec<InvocationFrame>,
    pub error: RigupError,
}

impl RecordedFailure {
    /// `[outer, inner]` call path.
    pub fn path(&self) -> String {
        self.frames
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RecordedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "An unexpected error has occurred [{}]: {}",
            self.path(),
            self.error
        )
    }
}

#[derive(Debug, Default)]
pub struct ExecutionContext {
    frames: Vec<InvocationFrame>,
    failures: Vec<RecordedFailure>,
    restart: Option<CommandArgs>,
}

impl ExecutionContext {
    pub fn push_frame(&mut self, frame: InvocationFrame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<InvocationFrame> {
        self.frames.pop()
    }

    pub fn frames(&self) -> &[InvocationFrame] {
        &self.frames
    }

    /// Record `error` against the current call path.
    pub fn record(&mut self, error: RigupError) -> &RecordedFailure {
        self.failures.push(RecordedFailure {
            frames: self.frames.clone(),
            error,
        });
        &self.failures[self.failures.len() - 1]
    }

    pub fn failures(&self) -> &[RecordedFailure] {
        &self.failures
    }

    pub fn request_restart(&mut self, args: CommandArgs) {
        self.restart = Some(args);
    }

    pub fn take_restart(&mut self) -> Option<CommandArgs> {
        self.restart.take()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventArgs;

    #[test]
    fn failure_captures_nested_path() {
        let mut ctx = ExecutionContext::default();
        ctx.push_frame(InvocationFrame::new(
            "phase:configure",
            "file:walk",
            "execute",
            &EventArgs::new(),
        ));
        ctx.push_frame(InvocationFrame::new(
            "file:found",
            "template:render",
            "render",
            &EventArgs::new().kwarg("target", "invalid"),
        ));

        let failure = ctx.record(RigupError::action("template:render", "Unknown variable: x"));
        assert_eq!(
            failure.to_string(),
            "An unexpected error has occurred [phase:configure => file:walk.execute(), \
             file:found => template:render.render(target=invalid)]: Unknown variable: x"
        );
    }

    #[test]
    fn restart_is_taken_once() {
        let mut ctx = ExecutionContext::default();
        ctx.request_restart(CommandArgs::new().option("x", 1));
        assert!(ctx.take_restart().is_some());
        assert!(ctx.take_restart().is_none());
    }

    #[test]
    fn reset_clears_failures() {
        let mut ctx = ExecutionContext::default();
        ctx.record(RigupError::action("a", "b"));
        ctx.reset();
        assert!(ctx.failures().is_empty());
    }
}
