//! `fixuid`: installs [fixuid](https://github.com/boxboat/fixuid) in the
//! images of compose services whose build context holds a `fixuid.yml`.
//!
//! Services are learned from `docker:docker-compose-config`. Dockerfiles
//! generated afterwards are patched as soon as `file:generated` reports them.

use std::{
    cell::RefCell,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use rigup_core::{
    application::{Action, ApplicationError, Engine, Feature, resolve_section},
    domain::{Dependency, EventArgs, EventBinding, EventBindings, RegistryObject},
    error::{RigupError, RigupResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    docker::COMPOSE_CONFIG,
    file::FILE_GENERATED,
    support::{fs_error, project_home, write_if_changed},
};

pub const NAME: &str = "fixuid";

pub const DEFAULT_URL: &str =
    "https://github.com/boxboat/fixuid/releases/download/v0.6.0/fixuid-0.6.0-linux-amd64.tar.gz";

/// Marks a build context as wanting fixuid.
const MARKER: &str = "fixuid.yml";
const ARCHIVE: &str = "fixuid.tar.gz";

const INSTALL_LINES: [&str; 3] = [
    "ADD fixuid.tar.gz /usr/local/bin",
    "RUN chown root:root /usr/local/bin/fixuid && \
     chmod 4755 /usr/local/bin/fixuid && \
     mkdir -p /etc/fixuid",
    "COPY fixuid.yml /etc/fixuid/config.yml",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FixuidConfig {
    /// Where `fixuid.tar.gz` is downloaded from when a context lacks it.
    pub url: String,
    pub disabled: bool,
}

impl Default for FixuidConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            disabled: false,
        }
    }
}

#[derive(Debug)]
pub struct FixuidFeature {
    url: RefCell<String>,
}

impl Default for FixuidFeature {
    fn default() -> Self {
        Self {
            url: RefCell::new(DEFAULT_URL.into()),
        }
    }
}

impl RegistryObject for FixuidFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for FixuidFeature {
    fn description(&self) -> &str {
        "Fix file ownership inside docker containers with fixuid"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![
            Dependency::required("core"),
            Dependency::required("docker"),
            Dependency::optional("file"),
        ]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let config: FixuidConfig = resolve_section(engine, NAME, |config: &mut FixuidConfig| {
            if config.url.is_empty() {
                return Err(ApplicationError::InvalidConfiguration {
                    key: "fixuid.url".into(),
                    reason: "must not be empty".into(),
                }
                .into());
            }
            Ok(())
        })?;
        *self.url.borrow_mut() = config.url;
        Ok(())
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(FixuidAction::new(self.url.borrow().clone()))]
    }
}

/// A compose service built from a local context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildService {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
}

pub struct FixuidAction {
    url: String,
    /// Services from the last compose configuration seen.
    services: Rc<RefCell<Vec<BuildService>>>,
}

impl FixuidAction {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            services: Rc::default(),
        }
    }
}

impl RegistryObject for FixuidAction {
    fn name(&self) -> &str {
        "fixuid:docker"
    }
}

impl Action for FixuidAction {
    fn description(&self) -> String {
        "Install fixuid in docker images that ship a fixuid.yml".into()
    }

    fn event_bindings(&self) -> EventBindings {
        let services = Rc::clone(&self.services);
        vec![
            EventBinding::on(COMPOSE_CONFIG),
            EventBinding::on(FILE_GENERATED)
                .call("apply")
                .process(move |args| {
                    let target = std::path::absolute(args.get_str("target")?).ok()?;
                    let services = services.borrow();
                    let service = services.iter().find(|s| s.dockerfile == target)?;
                    Some(
                        EventArgs::new()
                            .kwarg("context", service.context.to_string_lossy())
                            .kwarg("dockerfile", service.dockerfile.to_string_lossy()),
                    )
                }),
        ]
        .into()
    }

    fn execute(&self, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        let config = args
            .get("config")
            .ok_or_else(|| RigupError::action(self.name(), "missing config argument"))?;
        let found = fixuid_services(config, &project_home(engine));
        debug!(services = found.len(), "Services with fixuid configuration");
        *self.services.borrow_mut() = found.clone();

        let mut applied = 0u64;
        for service in &found {
            if self.apply(engine, service)? {
                applied += 1;
            }
        }
        Ok(Value::from(applied))
    }

    fn call(&self, method: &str, engine: &Engine, args: &EventArgs) -> RigupResult<Value> {
        match method {
            "execute" => self.execute(engine, args),
            "apply" => {
                let (Some(context), Some(dockerfile)) =
                    (args.get_str("context"), args.get_str("dockerfile"))
                else {
                    return Err(RigupError::action(
                        self.name(),
                        "missing context or dockerfile argument",
                    ));
                };
                let service = BuildService {
                    context: PathBuf::from(context),
                    dockerfile: PathBuf::from(dockerfile),
                };
                self.apply(engine, &service).map(Value::Bool)
            }
            _ => Err(ApplicationError::UnknownMethod {
                action: self.name().to_owned(),
                method: method.to_owned(),
            }
            .into()),
        }
    }
}

impl FixuidAction {
    /// Make sure the archive is in the build context and patch the
    /// Dockerfile. Returns whether the Dockerfile changed.
    fn apply(&self, engine: &Engine, service: &BuildService) -> RigupResult<bool> {
        let archive = service.context.join(ARCHIVE);
        if !archive.is_file() {
            self.download(&archive)?;
        }
        engine.emit(
            FILE_GENERATED,
            &EventArgs::new()
                .kwarg("source", self.url.as_str())
                .kwarg("target", archive.to_string_lossy()),
        )?;

        let dockerfile = &service.dockerfile;
        let content =
            fs::read_to_string(dockerfile).map_err(|e| fs_error(dockerfile, "read Dockerfile", e))?;
        let Some(patched) = patch_dockerfile(&content) else {
            debug!(dockerfile = %dockerfile.display(), "fixuid already installed");
            return Ok(false);
        };
        write_if_changed(dockerfile, &patched)?;

        let root = project_home(engine);
        let shown = dockerfile.strip_prefix(&root).unwrap_or(dockerfile);
        engine
            .console()
            .success(&format!("Fixuid applied to {}", shown.display()));
        Ok(true)
    }

    fn download(&self, target: &Path) -> RigupResult<()> {
        debug!(url = %self.url, target = %target.display(), "Downloading fixuid");
        let response = ureq::get(&self.url).call().map_err(|e| {
            RigupError::action(self.name(), format!("Failed to download {}: {e}", self.url))
        })?;

        let partial = target.with_extension("part");
        let written = fs::File::create(&partial)
            .and_then(|mut file| io::copy(&mut response.into_reader(), &mut file));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(fs_error(&partial, "write download", e));
        }
        fs::rename(&partial, target).map_err(|e| fs_error(target, "move download", e))
    }
}

/// Build services of a compose configuration whose context has a
/// `fixuid.yml`. Relative contexts resolve against `root`.
pub fn fixuid_services(config: &Value, root: &Path) -> Vec<BuildService> {
    let Some(services) = config.get("services").and_then(Value::as_object) else {
        return Vec::new();
    };

    services
        .values()
        .filter_map(|service| {
            let (context, dockerfile) = match service.get("build")? {
                Value::String(context) => (context.as_str(), "Dockerfile"),
                Value::Object(build) => (
                    build.get("context")?.as_str()?,
                    build
                        .get("dockerfile")
                        .and_then(Value::as_str)
                        .unwrap_or("Dockerfile"),
                ),
                _ => return None,
            };
            let context = root.join(context);
            if !context.join(MARKER).is_file() {
                return None;
            }
            let dockerfile = context.join(dockerfile);
            Some(BuildService {
                context,
                dockerfile,
            })
        })
        .collect()
}

struct Instruction {
    keyword: String,
    first: usize,
    last: usize,
}

/// Split into instructions, following `\` continuations.
fn instructions(lines: &[&str]) -> Vec<Instruction> {
    let mut parsed = Vec::new();
    let mut open: Option<Instruction> = None;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        match open.as_mut() {
            Some(current) => current.last = i,
            None if trimmed.is_empty() || trimmed.starts_with('#') => continue,
            None => {
                let keyword = trimmed
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_uppercase();
                open = Some(Instruction {
                    keyword,
                    first: i,
                    last: i,
                });
            }
        }
        if !trimmed.ends_with('\\') {
            parsed.extend(open.take());
        }
    }

    parsed.extend(open.take());
    parsed
}

fn arguments(lines: &[&str], instruction: &Instruction) -> String {
    let joined = lines[instruction.first..=instruction.last]
        .iter()
        .map(|line| line.trim().trim_end_matches('\\').trim())
        .collect::<Vec<_>>()
        .join(" ");
    joined
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim().to_owned())
        .unwrap_or_default()
}

fn last<'a>(stage: &'a [Instruction], keyword: &str) -> Option<&'a Instruction> {
    stage.iter().rev().find(|i| i.keyword == keyword)
}

/// Install fixuid in the final build stage and run it as the entrypoint.
///
/// The install lines go before the stage's last `USER` (fixuid must be
/// set up as root), else before its last `ENTRYPOINT`, else at the end.
/// Returns `None` when the Dockerfile already installs fixuid.
pub fn patch_dockerfile(content: &str) -> Option<String> {
    if content.lines().any(|line| line.trim() == INSTALL_LINES[0]) {
        return None;
    }

    let lines: Vec<&str> = content.lines().collect();
    let parsed = instructions(&lines);
    let stage_start = parsed
        .iter()
        .rposition(|i| i.keyword == "FROM")
        .map_or(0, |p| p + 1);
    let stage = &parsed[stage_start..];
    let entrypoint = last(stage, "ENTRYPOINT");
    let anchor = last(stage, "USER").or(entrypoint).map(|i| i.first);

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + INSTALL_LINES.len());
    let mut i = 0;
    while i < lines.len() {
        if anchor == Some(i) {
            out.extend(INSTALL_LINES.map(String::from));
        }
        match entrypoint {
            Some(e) if e.first == i => {
                let value = prefix_entrypoint(&arguments(&lines, e));
                out.push(format!("ENTRYPOINT {value}"));
                i = e.last + 1;
            }
            _ => {
                out.push(lines[i].to_owned());
                i += 1;
            }
        }
    }
    if anchor.is_none() {
        out.extend(INSTALL_LINES.map(String::from));
    }

    let mut patched = out.join("\n");
    patched.push('\n');
    Some(patched)
}

/// Prefix an `ENTRYPOINT` value, exec or shell form, with `fixuid -q`.
pub fn prefix_entrypoint(entrypoint: &str) -> String {
    let entrypoint = entrypoint.trim();

    if entrypoint.starts_with('[') {
        if let Ok(mut args) = serde_json::from_str::<Vec<String>>(entrypoint) {
            if args.first().map(String::as_str) != Some("fixuid") {
                args.splice(0..0, ["fixuid".to_owned(), "-q".to_owned()]);
            }
            let quoted: Vec<String> = args
                .into_iter()
                .map(|arg| Value::String(arg).to_string())
                .collect();
            return format!("[{}]", quoted.join(", "));
        }
    }

    let quote = entrypoint
        .chars()
        .next()
        .filter(|&c| (c == '"' || c == '\'') && entrypoint.len() > 1 && entrypoint.ends_with(c));
    let inner = match quote {
        Some(_) => &entrypoint[1..entrypoint.len() - 1],
        None => entrypoint,
    };
    if inner.starts_with("fixuid ") {
        return entrypoint.to_owned();
    }
    match quote {
        Some(q) => format!("{q}fixuid -q {inner}{q}"),
        None => format!("fixuid -q {inner}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn install_goes_before_the_last_user_and_entrypoint_is_prefixed() {
        let dockerfile = "FROM debian\nRUN apt-get update\nUSER app\n\
                          ENTRYPOINT [\"/entry.sh\", \"serve\"]\n";

        let patched = patch_dockerfile(dockerfile).unwrap();

        assert_eq!(
            patched,
            "FROM debian\n\
             RUN apt-get update\n\
             ADD fixuid.tar.gz /usr/local/bin\n\
             RUN chown root:root /usr/local/bin/fixuid && chmod 4755 /usr/local/bin/fixuid \
             && mkdir -p /etc/fixuid\n\
             COPY fixuid.yml /etc/fixuid/config.yml\n\
             USER app\n\
             ENTRYPOINT [\"fixuid\", \"-q\", \"/entry.sh\", \"serve\"]\n"
        );
    }

    #[test]
    fn patching_is_idempotent() {
        let patched = patch_dockerfile("FROM alpine\nENTRYPOINT /entry.sh\n").unwrap();
        assert!(patched.contains("ENTRYPOINT fixuid -q /entry.sh"));
        assert!(patch_dockerfile(&patched).is_none());
    }

    #[test]
    fn without_user_or_entrypoint_the_install_is_appended() {
        let patched = patch_dockerfile("FROM alpine\nCMD [\"sh\"]").unwrap();
        let lines: Vec<&str> = patched.lines().collect();
        assert_eq!(lines[..2], ["FROM alpine", "CMD [\"sh\"]"]);
        assert_eq!(lines[2], INSTALL_LINES[0]);
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn only_the_final_stage_is_considered() {
        let dockerfile = "FROM golang AS build\nUSER builder\nRUN make\n\
                          FROM alpine\nCOPY --from=build /app /app\n";
        let patched = patch_dockerfile(dockerfile).unwrap();
        let lines: Vec<&str> = patched.lines().collect();
        assert_eq!(lines[1], "USER builder");
        assert_eq!(lines[5], INSTALL_LINES[0]);
    }

    #[test]
    fn multi_line_entrypoint_is_collapsed() {
        let dockerfile = "FROM alpine\nENTRYPOINT [\"/entry.sh\", \\\n  \"--verbose\"]\nCMD []\n";
        let patched = patch_dockerfile(dockerfile).unwrap();
        assert!(
            patched.contains("ENTRYPOINT [\"fixuid\", \"-q\", \"/entry.sh\", \"--verbose\"]\n")
        );
        assert!(patched.ends_with("CMD []\n"));
    }

    #[test]
    fn quoted_shell_entrypoint_keeps_its_quotes() {
        assert_eq!(prefix_entrypoint("\"run.sh -v\""), "\"fixuid -q run.sh -v\"");
        assert_eq!(prefix_entrypoint("fixuid -q run.sh"), "fixuid -q run.sh");
    }

    #[test]
    fn only_contexts_with_fixuid_yml_are_selected() {
        let root = TempDir::new().unwrap();
        for dir in ["web", "worker"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("web/fixuid.yml"), "user: app\n").unwrap();
        let config = json!({"services": {
            "web": {"build": {"context": "web", "dockerfile": "Dockerfile.dev"}},
            "worker": {"build": "worker"},
            "db": {"image": "postgres"}
        }});

        let services = fixuid_services(&config, root.path());

        assert_eq!(
            services,
            [BuildService {
                context: root.path().join("web"),
                dockerfile: root.path().join("web/Dockerfile.dev"),
            }]
        );
    }

    #[test]
    fn generated_dockerfiles_of_known_services_are_routed_to_apply() {
        let action = FixuidAction::new(DEFAULT_URL);
        action.services.borrow_mut().push(BuildService {
            context: PathBuf::from("/p/web"),
            dockerfile: PathBuf::from("/p/web/Dockerfile"),
        });
        let bindings = action.event_bindings().normalize();
        assert_eq!(bindings[0].event, COMPOSE_CONFIG);
        assert_eq!(bindings[1].method.as_deref(), Some("apply"));
        let processor = bindings[1].processor.clone().unwrap();

        assert!(processor(&EventArgs::new().kwarg("target", "/p/web/app.conf")).is_none());
        let args = processor(&EventArgs::new().kwarg("target", "/p/web/Dockerfile")).unwrap();
        assert_eq!(args.get_str("context"), Some("/p/web"));
        assert_eq!(args.get_str("dockerfile"), Some("/p/web/Dockerfile"));
    }
}
