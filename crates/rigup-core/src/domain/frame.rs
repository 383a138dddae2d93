use std::fmt;

use super::EventArgs;

/// One handler invocation on the call path of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationFrame {
    pub event: String,
    pub action: String,
    pub method: String,
    pub arguments: String,
}

impl InvocationFrame {
    pub fn new(event: &str, action: &str, method: &str, args: &EventArgs) -> Self {
        Self {
            event: event.to_owned(),
            action: action.to_owned(),
            method: method.to_owned(),
            arguments: args.summary(),
        }
    }
}

impl fmt::Display for InvocationFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} => {}.{}({})",
            self.event, self.action, self.method, self.arguments
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_event_action_method_and_arguments() {
        let frame = InvocationFrame::new(
            "file:found",
            "template:render",
            "render",
            &EventArgs::new().kwarg("target", "a").kwarg("template", "a.tmpl"),
        );
        assert_eq!(
            frame.to_string(),
            "file:found => template:render.render(target=a, template=a.tmpl)"
        );
    }
}
