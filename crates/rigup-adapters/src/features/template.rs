//! `template`: renders `*.tmpl` files found in the project.
//!
//! Placeholders are `{{ dotted.config.path }}` and resolve against the
//! whole configuration tree.

use std::{cell::RefCell, fs, path::PathBuf, rc::Rc};

use rigup_core::{
    application::{Action, ApplicationError, Engine, Feature, resolve_section},
    domain::{
        Dependency, EventArgs, EventBinding, EventBindings, RegistryObject, value_path::get_path,
    },
    error::RigupResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    file::{FILE_FOUND, FILE_GENERATED},
    support::{fs_error, write_if_changed},
};
use crate::cache::PROJECT_CACHE;

pub const NAME: &str = "template";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateConfig {
    pub suffix: String,
    pub disabled: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            suffix: ".tmpl".into(),
            disabled: false,
        }
    }
}

#[derive(Debug)]
pub struct TemplateFeature {
    suffix: RefCell<String>,
}

impl Default for TemplateFeature {
    fn default() -> Self {
        Self {
            suffix: RefCell::new(TemplateConfig::default().suffix),
        }
    }
}

impl RegistryObject for TemplateFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for TemplateFeature {
    fn description(&self) -> &str {
        "Render configuration values into template files"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::required("core"), Dependency::optional("file")]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let config: TemplateConfig = resolve_section(engine, NAME, |config: &mut TemplateConfig| {
            if config.suffix.is_empty() {
                return Err(ApplicationError::InvalidConfiguration {
                    key: "template.suffix".into(),
                    reason: "must not be empty".into(),
                }
                .into());
            }
            Ok(())
        })?;
        *self.suffix.borrow_mut() = config.suffix;
        Ok(())
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(RenderAction {
            suffix: self.suffix.borrow().clone(),
        })]
    }
}

pub struct RenderAction {
    suffix: String,
}

impl RegistryObject for RenderAction {
    fn name(&self) -> &str {
        "template:render"
    }
}

impl Action for RenderAction {
    fn description(&self) -> String {
        "Render template files".into()
    }

    fn event_bindings(&self) -> EventBindings {
        let suffix = self.suffix.clone();
        vec![EventBinding::on(FILE_FOUND).call("render").process(move |args| {
            let file = args.get_str("file")?;
            let target = file.strip_suffix(suffix.as_str())?;
            if target.is_empty() {
                return None;
            }
            Some(
                EventArgs::new()
                    .kwarg("template", file)
                    .kwarg("target", target),
            )
        })]
        .into()
    }

    fn execute(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        self.render(engine, args)
    }

    fn call(&self, method: &str, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        match method {
            "render" | "execute" => self.render(engine, args),
            _ => Err(ApplicationError::UnknownMethod {
                action: self.name().to_owned(),
                method: method.to_owned(),
            }
            .into()),
        }
    }
}

impl RenderAction {
    fn render(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        let (Some(template), Some(target)) = (args.get_str("template"), args.get_str("target"))
        else {
            return Err(ApplicationError::RenderingFailed {
                reason: "missing template or target argument".into(),
            }
            .into());
        };

        let source = fs::read_to_string(template)
            .map_err(|e| fs_error(&PathBuf::from(template), "read template", e))?;
        let rendered = render_placeholders(&source, &engine.config().data())?;

        let key = format!("{NAME}:{target}");
        let cache = engine.cache(PROJECT_CACHE);
        let cached = cache
            .as_ref()
            .and_then(|c| c.get(&key))
            .is_some_and(|v| v.as_str() == Some(rendered.as_str()));
        let target_path = PathBuf::from(target);

        if cached && target_path.exists() {
            debug!(output = target, "Template output unchanged");
        } else {
            write_if_changed(&target_path, &rendered)?;
            if let Some(cache) = &cache {
                cache.set(&key, Value::String(rendered));
            }
            debug!(template, output = target, "Rendered template");
        }

        engine.emit(
            FILE_GENERATED,
            &EventArgs::new()
                .kwarg("source", template)
                .kwarg("target", target),
        )?;
        Ok(Value::from(target))
    }
}

/// Replace every `{{ path }}` in `source` with the value at `path`.
pub fn render_placeholders(source: &str, data: &Value) -> RigupResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(ApplicationError::RenderingFailed {
                reason: "unterminated '{{' placeholder".into(),
            }
            .into());
        };

        let expression = after[..end].trim();
        match get_path(data, expression) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => {
                return Err(ApplicationError::RenderingFailed {
                    reason: format!("Unknown variable: {expression}"),
                }
                .into());
            }
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholders_resolve_dotted_paths() {
        let data = json!({"core": {"project": {"name": "app"}}, "docker": {"port_prefix": 123}});
        assert_eq!(
            render_placeholders("name={{ core.project.name }} port={{docker.port_prefix}}80", &data)
                .unwrap(),
            "name=app port=12380"
        );
    }

    #[test]
    fn unknown_placeholder_fails() {
        let err = render_placeholders("{{ nope }}", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Template rendering failed: Unknown variable: nope");
    }

    #[test]
    fn unterminated_placeholder_fails() {
        assert!(render_placeholders("{{ core", &json!({})).is_err());
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(render_placeholders("plain } text", &json!({})).unwrap(), "plain } text");
    }

    #[test]
    fn processor_keeps_only_templates() {
        let action = RenderAction {
            suffix: ".tmpl".into(),
        };
        let bindings = action.event_bindings().normalize();
        let processor = bindings[0].processor.clone().unwrap();

        assert!(processor(&EventArgs::new().kwarg("file", "/p/readme.md")).is_none());
        let args = processor(&EventArgs::new().kwarg("file", "/p/.env.tmpl")).unwrap();
        assert_eq!(args.get_str("target"), Some("/p/.env"));
        assert_eq!(args.get_str("template"), Some("/p/.env.tmpl"));
    }
}
