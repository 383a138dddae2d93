use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, File, FileFormat};
use rigup_core::{
    application::ports::{ConfigPaths, ConfigStore},
    domain::value_path,
    error::RigupResult,
};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{CONFIG_BASENAMES, ConfigLoadError, ENV_PREFIX, apply_env_overrides};

/// Everything configuration loading reads from the outside world.
///
/// Kept explicit so tests can load configuration without touching the
/// process environment.
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    pub env_prefix: String,
    /// Environment snapshot used for path variables and overrides.
    pub env: HashMap<String, String>,
    /// Fallback project home when `<PREFIX>_PROJECT_HOME` is unset.
    pub cwd: PathBuf,
    /// Fallback for `<PREFIX>_HOME`; usually `~/.rigup`.
    pub default_home: Option<PathBuf>,
    /// Extra file given on the command line. It must exist.
    pub extra_file: Option<PathBuf>,
}

impl ConfigOptions {
    /// Options for the running process.
    pub fn from_process() -> Result<Self, ConfigLoadError> {
        let cwd = std::env::current_dir().map_err(|_| ConfigLoadError::NoDirectory("current"))?;
        Ok(Self {
            env_prefix: ENV_PREFIX.to_owned(),
            env: std::env::vars().collect(),
            cwd,
            default_home: directories::BaseDirs::new().map(|d| d.home_dir().join(".rigup")),
            extra_file: None,
        })
    }

    pub fn with_extra_file(mut self, file: Option<PathBuf>) -> Self {
        self.extra_file = file;
        self
    }

    fn var(&self, suffix: &str) -> Option<PathBuf> {
        self.env
            .get(&format!("{}_{suffix}", self.env_prefix))
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Resolve the three configuration directories.
    pub fn paths(&self) -> Result<ConfigPaths, ConfigLoadError> {
        let project_home = self.var("PROJECT_HOME").unwrap_or_else(|| self.cwd.clone());
        let home = self
            .var("HOME")
            .or_else(|| self.default_home.clone())
            .ok_or(ConfigLoadError::NoDirectory("home"))?;
        let rigup_home = self.var("RIGUP_HOME").unwrap_or_else(|| home.join("rigup"));

        Ok(ConfigPaths {
            rigup_home,
            home,
            project_home,
        })
    }
}

/// Configuration merged from files and environment.
pub struct LayeredConfig {
    options: ConfigOptions,
    paths: ConfigPaths,
    data: RefCell<Value>,
}

impl LayeredConfig {
    #[instrument(skip_all)]
    pub fn load(options: ConfigOptions) -> Result<Self, ConfigLoadError> {
        let paths = options.paths()?;
        let data = load_tree(&paths, &options)?;

        debug!(project_home = %paths.project_home.display(), "Configuration loaded");
        Ok(Self {
            options,
            paths,
            data: RefCell::new(data),
        })
    }
}

/// Candidate files, lowest priority first.
pub(crate) fn candidate_files(paths: &ConfigPaths) -> Vec<PathBuf> {
    let mut dirs: Vec<&Path> = Vec::with_capacity(3);
    for dir in [&paths.rigup_home, &paths.home, &paths.project_home] {
        if !dirs.contains(&dir.as_path()) {
            dirs.push(dir);
        }
    }

    dirs.into_iter()
        .flat_map(|dir| {
            CONFIG_BASENAMES
                .iter()
                .map(move |base| dir.join(format!("{base}.toml")))
        })
        .collect()
}

/// Files merged in priority order, then environment overrides.
fn load_tree(paths: &ConfigPaths, options: &ConfigOptions) -> Result<Value, ConfigLoadError> {
    let data = read_files(paths, options.extra_file.as_deref())?;
    let prefix = format!("{}_OVERRIDE", options.env_prefix);
    Ok(apply_env_overrides(data, &prefix, &options.env))
}

fn read_files(paths: &ConfigPaths, extra: Option<&Path>) -> Result<Value, ConfigLoadError> {
    let mut builder = Config::builder();
    for file in candidate_files(paths) {
        builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(false));
    }
    if let Some(extra) = extra {
        if !extra.exists() {
            return Err(ConfigLoadError::MissingFile(extra.to_path_buf()));
        }
        builder = builder.add_source(File::from(extra).format(FileFormat::Toml));
    }

    match builder.build()?.try_deserialize::<Value>()? {
        Value::Object(map) => Ok(Value::Object(map)),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigLoadError::NotATable),
    }
}

impl ConfigStore for LayeredConfig {
    fn get(&self, path: &str) -> Option<Value> {
        value_path::get_path(&self.data.borrow(), path).cloned()
    }

    fn set(&self, path: &str, value: Value) {
        value_path::set_path(&mut self.data.borrow_mut(), path, value);
    }

    fn data(&self) -> Value {
        self.data.borrow().clone()
    }

    fn paths(&self) -> ConfigPaths {
        self.paths.clone()
    }

    fn env_prefix(&self) -> &str {
        &self.options.env_prefix
    }

    fn apply_overrides(&self, namespace: &str, value: Value) -> Value {
        let prefix = format!("{}_OVERRIDE_{namespace}", self.options.env_prefix);
        apply_env_overrides(value, &prefix, &self.options.env)
    }

    /// Re-read every file, discarding in-memory changes.
    fn reload(&self) -> RigupResult<()> {
        let data = load_tree(&self.paths, &self.options)?;
        *self.data.borrow_mut() = data;
        debug!("Configuration reloaded");
        Ok(())
    }

    fn reset(&self) {
        *self.data.borrow_mut() = Value::Object(Map::new());
    }
}
