//! `shell`: activation scripts and binary shims.
//!
//! `rigup activate` prints the statements that export the flattened
//! configuration into the calling shell, e.g. `eval "$(rigup activate)"`.
//! The environment as it was before activation is kept base64-encoded in
//! `<PREFIX>_SHELL_ENVIRON_BACKUP` so `rigup deactivate` can undo it.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
    rc::Rc,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rigup_core::{
    application::{Action, ApplicationError, Engine, Feature, resolve_section},
    domain::{Binary, Dependency, EventArgs, EventBindings, RegistryObject, value_path},
    error::{Context, RigupError, RigupResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    file::FILE_GENERATED,
    support::{make_executable, project_home, shell_quote, wildcard_match, write_if_changed},
};

pub const NAME: &str = "shell";

/// Directory binary shims are written to, relative to the project home.
pub const SHIMS_DIR: &str = ".bin";

pub type Environ = BTreeMap<String, String>;

/// Statements understood by one family of shells.
pub trait ShellIntegration {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn set_env(&self, key: &str, value: &str) -> String;

    fn unset_env(&self, key: &str) -> String;
}

/// bash, zsh and friends.
#[derive(Debug, Clone)]
pub struct PosixShell {
    name: &'static str,
}

impl PosixShell {
    pub fn bash() -> Self {
        Self { name: "bash" }
    }

    pub fn zsh() -> Self {
        Self { name: "zsh" }
    }
}

impl ShellIntegration for PosixShell {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "POSIX shell"
    }

    fn set_env(&self, key: &str, value: &str) -> String {
        format!("export {key}={}", shell_quote(value))
    }

    fn unset_env(&self, key: &str) -> String {
        format!("unset {key}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct FishShell;

impl ShellIntegration for FishShell {
    fn name(&self) -> &str {
        "fish"
    }

    fn description(&self) -> &str {
        "fish shell"
    }

    fn set_env(&self, key: &str, value: &str) -> String {
        let escaped = value.replace('\\', r"\\").replace('\'', r"\'");
        format!("set -gx {key} '{escaped}'")
    }

    fn unset_env(&self, key: &str) -> String {
        format!("set -e {key}")
    }
}

fn integrations() -> Vec<Rc<dyn ShellIntegration>> {
    vec![
        Rc::new(PosixShell::bash()),
        Rc::new(PosixShell::zsh()),
        Rc::new(FishShell),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell the activation script is written for.
    pub shell: Option<String>,
    /// Wildcards of variable names activation never touches.
    pub envignore: Vec<String>,
    pub path: PathConfig,
    pub disabled: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            shell: None,
            envignore: ["PYENV_*", "_", "PS1", "PS2", "PS3", "PS4", "PWD"]
                .map(String::from)
                .to_vec(),
            path: PathConfig::default(),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    /// Added to `PATH`, relative to the project home.
    pub directories: Vec<String>,
    pub prepend: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            directories: vec![SHIMS_DIR.into(), "bin".into()],
            prepend: true,
        }
    }
}

pub struct ShellFeature {
    environ: Rc<Environ>,
    config: Rc<RefCell<ShellConfig>>,
}

impl ShellFeature {
    pub fn with_environ(environ: Environ) -> Self {
        Self {
            environ: Rc::new(environ),
            config: Rc::default(),
        }
    }
}

impl RegistryObject for ShellFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for ShellFeature {
    fn description(&self) -> &str {
        "Shell integration"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::required("core")]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let detected = self
            .environ
            .get("SHELL")
            .and_then(|s| Path::new(s).file_name())
            .map(|n| n.to_string_lossy().into_owned());

        let config = resolve_section(engine, NAME, |config: &mut ShellConfig| {
            let shell = config
                .shell
                .get_or_insert_with(|| detected.unwrap_or_else(|| "bash".into()));
            if !integrations().iter().any(|i| i.name() == shell.as_str()) {
                return Err(ApplicationError::InvalidConfiguration {
                    key: "shell.shell".into(),
                    reason: format!("unsupported shell '{shell}' (expected bash, zsh or fish)"),
                }
                .into());
            }
            Ok(())
        })?;

        *self.config.borrow_mut() = config;
        Ok(())
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        let mut actions: Vec<Rc<dyn Action>> = Vec::new();
        for shell in integrations() {
            actions.push(Rc::new(ActivateAction {
                name: format!("{NAME}:{}:activate", shell.name()),
                shell: Rc::clone(&shell),
                environ: Rc::clone(&self.environ),
                config: Rc::clone(&self.config),
            }));
            actions.push(Rc::new(DeactivateAction {
                name: format!("{NAME}:{}:deactivate", shell.name()),
                shell,
                environ: Rc::clone(&self.environ),
                config: Rc::clone(&self.config),
            }));
        }
        actions.push(Rc::new(BinaryShimsAction));
        actions
    }
}

fn selected(shell: &dyn ShellIntegration, config: &RefCell<ShellConfig>) -> bool {
    config.borrow().shell.as_deref() == Some(shell.name())
}

fn backup_key(engine: &Engine) -> String {
    format!("{}_SHELL_ENVIRON_BACKUP", engine.config().env_prefix())
}

pub struct ActivateAction {
    name: String,
    shell: Rc<dyn ShellIntegration>,
    environ: Rc<Environ>,
    config: Rc<RefCell<ShellConfig>>,
}

impl RegistryObject for ActivateAction {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Action for ActivateAction {
    fn description(&self) -> String {
        format!("Write the activation script for {}", self.shell.description())
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:activate".into()
    }

    fn order(&self) -> i32 {
        -256
    }

    fn disabled(&self, _engine: &Engine) -> bool {
        !selected(self.shell.as_ref(), &self.config)
    }

    fn execute(&self, engine: &Engine, _args: &EventArgs) -> RigupResult<Value> {
        let config = self.config.borrow().clone();
        let initial = self.environ.as_ref();
        let prefix = engine.config().env_prefix().to_owned();

        let mut target = initial.clone();
        target.extend(config_environ(&engine.config().data(), &prefix));
        target.insert(backup_key(engine), encode_backup(initial)?);
        target.insert(
            format!("{prefix}_PROJECT_HOME"),
            project_home(engine).to_string_lossy().into_owned(),
        );

        let mut lines = diff_statements(self.shell.as_ref(), initial, &target, &config.envignore);

        if !config.path.directories.is_empty() {
            let root = project_home(engine);
            let mut path = initial.get("PATH").cloned().unwrap_or_default();
            for directory in &config.path.directories {
                let dir = normalize(&root.join(directory)).to_string_lossy().into_owned();
                path = match (path.is_empty(), config.path.prepend) {
                    (true, _) => dir,
                    (false, true) => format!("{dir}:{path}"),
                    (false, false) => format!("{path}:{dir}"),
                };
            }
            lines.push(self.shell.set_env("PATH", &path));
        }

        for line in &lines {
            engine.console().print(line);
        }
        debug!(shell = self.shell.name(), statements = lines.len(), "Activation written");
        Ok(Value::from(lines.len()))
    }
}

pub struct DeactivateAction {
    name: String,
    shell: Rc<dyn ShellIntegration>,
    environ: Rc<Environ>,
    config: Rc<RefCell<ShellConfig>>,
}

impl RegistryObject for DeactivateAction {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Action for DeactivateAction {
    fn description(&self) -> String {
        format!("Write the deactivation script for {}", self.shell.description())
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:deactivate".into()
    }

    fn disabled(&self, _engine: &Engine) -> bool {
        !selected(self.shell.as_ref(), &self.config)
    }

    fn execute(&self, engine: &Engine, _args: &EventArgs) -> RigupResult<Value> {
        let Some(encoded) = self.environ.get(&backup_key(engine)) else {
            debug!("No environment backup, nothing to deactivate");
            return Ok(Value::from(0));
        };
        let backup =
            decode_backup(encoded).map_err(|reason| RigupError::action(&self.name, reason))?;
        let envignore = self.config.borrow().envignore.clone();

        let lines = diff_statements(self.shell.as_ref(), &self.environ, &backup, &envignore);
        for line in &lines {
            engine.console().print(line);
        }
        Ok(Value::from(lines.len()))
    }
}

/// Writes `.bin/<name>` for every registered binary.
pub struct BinaryShimsAction;

impl RegistryObject for BinaryShimsAction {
    fn name(&self) -> &str {
        "shell:binary-shims"
    }
}

impl Action for BinaryShimsAction {
    fn description(&self) -> String {
        "Create executable shims for project binaries".into()
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:configure".into()
    }

    fn execute(&self, engine: &Engine, _args: &EventArgs) -> RigupResult<Value> {
        let dir = project_home(engine).join(SHIMS_DIR);
        let mut written = 0usize;

        for binary in engine.binaries().all() {
            let shim = dir.join(binary.name());
            if write_if_changed(&shim, &shim_script(&binary))? {
                written += 1;
            }
            make_executable(&shim)?;
            engine.emit(
                FILE_GENERATED,
                &EventArgs::new()
                    .kwarg("source", binary.name())
                    .kwarg("target", shim.to_string_lossy().into_owned()),
            )?;
        }
        Ok(Value::from(written))
    }
}

fn shim_script(binary: &Binary) -> String {
    let command = binary
        .command
        .iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ");
    match &binary.workdir {
        Some(workdir) => format!(
            "#!/bin/sh\ncd {} && exec {command} \"$@\"\n",
            shell_quote(&workdir.to_string_lossy())
        ),
        None => format!("#!/bin/sh\nexec {command} \"$@\"\n"),
    }
}

/// `<PREFIX>_CORE_PROJECT_NAME=...` variables for the whole tree, plus the
/// raw entries of the top-level `env` table.
pub fn config_environ(data: &Value, prefix: &str) -> Environ {
    let mut environ: Environ = value_path::flatten(data, prefix, "_", &|p, i| format!("{p}_{i}"))
        .into_iter()
        .map(|(key, value)| (env_key(&key), value))
        .collect();

    if let Some(Value::Object(env)) = data.get("env") {
        for (key, value) in env {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            environ.insert(key.clone(), value);
        }
    }
    environ
}

fn env_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Statements turning `from` into `to`, sorted by variable name.
pub fn diff_statements(
    shell: &dyn ShellIntegration,
    from: &Environ,
    to: &Environ,
    envignore: &[String],
) -> Vec<String> {
    let ignored = |key: &str| envignore.iter().any(|pattern| wildcard_match(pattern, key));
    let keys: std::collections::BTreeSet<&String> = from.keys().chain(to.keys()).collect();

    keys.into_iter()
        .filter(|key| !ignored(key))
        .filter_map(|key| match (from.get(key), to.get(key)) {
            (_, Some(value)) if from.get(key) != Some(value) => Some(shell.set_env(key, value)),
            (Some(_), None) => Some(shell.unset_env(key)),
            _ => None,
        })
        .collect()
}

pub fn encode_backup(environ: &Environ) -> RigupResult<String> {
    let json = serde_json::to_vec(environ).context("environment backup")?;
    Ok(STANDARD.encode(json))
}

pub fn decode_backup(encoded: &str) -> Result<Environ, String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| format!("invalid environment backup: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid environment backup: {e}"))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
