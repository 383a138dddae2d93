//! `docker`: derives the settings docker-compose files are rendered with,
//! and publishes the resolved compose configuration once they are.

use std::{
    net::Ipv4Addr,
    path::{Path, PathBuf},
    process::Command,
    rc::Rc,
};

use rigup_core::{
    application::{Action, ApplicationError, Engine, Feature, resolve_section},
    domain::{Dependency, EventArgs, EventBindings, RegistryObject, Service},
    error::{RigupError, RigupResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::support::project_home;

pub const NAME: &str = "docker";

/// Emitted with the parsed `docker compose config` output as `config`.
pub const COMPOSE_CONFIG: &str = "docker:docker-compose-config";

const COMPOSE_FILES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

const DEFAULT_ID: u32 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DockerConfig {
    pub user: UserConfig,
    pub ip: Option<Ipv4Addr>,
    pub port_prefix: Option<u32>,
    pub compose: ComposeConfig,
    pub services: Vec<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComposeConfig {
    pub project_name: Option<String>,
    pub network_name: Option<String>,
    /// Prints the merged compose configuration as JSON.
    pub config_command: Vec<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            network_name: None,
            config_command: ["docker", "compose", "config", "--format", "json"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DockerFeature {
    docker_host: Option<String>,
}

impl DockerFeature {
    pub fn with_docker_host(docker_host: Option<String>) -> Self {
        Self { docker_host }
    }
}

impl RegistryObject for DockerFeature {
    fn name(&self) -> &str {
        NAME
    }
}

impl Feature for DockerFeature {
    fn description(&self) -> &str {
        "Docker and docker-compose integration"
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![Dependency::required("core")]
    }

    fn configure(&self, engine: &Engine) -> RigupResult<()> {
        let project_home = engine.config().paths().project_home;
        let project_name = engine
            .config()
            .get("core.project.name")
            .and_then(|v| v.as_str().map(str::to_owned));

        let config: DockerConfig = resolve_section(engine, NAME, |config: &mut DockerConfig| {
            let (uid, gid) = owner_ids(&project_home);
            config.user.uid.get_or_insert(uid);
            config.user.gid.get_or_insert(gid);

            if config.ip.is_none() {
                config.ip = Some(host_ip(self.docker_host.as_deref())?);
            }

            if config.port_prefix.is_none() {
                config.port_prefix = project_name.as_deref().map(port_prefix);
            }

            let project = config
                .compose
                .project_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| basename(&project_home));
            let project = normalize_name(&project);
            let network = config
                .compose
                .network_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("{project}_default"));
            config.compose.network_name = Some(normalize_name(&network));
            config.compose.project_name = Some(project);
            Ok(())
        })?;

        debug!(
            ip = ?config.ip,
            port_prefix = ?config.port_prefix,
            "Docker configured"
        );
        Ok(())
    }

    fn services(&self, engine: &Engine) -> Vec<Service> {
        engine
            .config()
            .get("docker.services")
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
            .unwrap_or_default()
            .into_iter()
            .map(|name| Service::new(name, NAME))
            .collect()
    }

    fn actions(&self) -> Vec<Rc<dyn Action>> {
        vec![Rc::new(EmitComposeConfigAction)]
    }
}

/// Runs `docker.compose.config_command` in the project home and emits
/// [`COMPOSE_CONFIG`] with its JSON output.
pub struct EmitComposeConfigAction;

impl RegistryObject for EmitComposeConfigAction {
    fn name(&self) -> &str {
        "docker:emit-docker-compose-config"
    }
}

impl Action for EmitComposeConfigAction {
    fn description(&self) -> String {
        "Emit the resolved docker compose configuration".into()
    }

    fn event_bindings(&self) -> EventBindings {
        "phase:configure".into()
    }

    // After templates, which may produce the compose file.
    fn order(&self) -> i32 {
        100
    }

    fn execute(&self, engine: &Engine, _args: &EventArgs) -> RigupResult<Value> {
        let root = project_home(engine);
        if !COMPOSE_FILES.iter().any(|file| root.join(file).is_file()) {
            debug!("No docker compose file, skipping");
            return Ok(Value::Null);
        }

        let command = engine
            .config()
            .get("docker.compose.config_command")
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
            .unwrap_or_else(|| ComposeConfig::default().config_command);
        let Some((program, args)) = command.split_first() else {
            return Err(RigupError::action(
                self.name(),
                "docker.compose.config_command is empty",
            ));
        };

        let output = Command::new(program)
            .args(args)
            .current_dir(&root)
            .output()
            .map_err(|e| RigupError::action(self.name(), format!("Failed to run {program}: {e}")))?;
        if !output.status.success() {
            return Err(RigupError::action(
                self.name(),
                format!(
                    "`{}` failed ({}): {}",
                    command.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let config: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            RigupError::action(self.name(), format!("Invalid compose configuration: {e}"))
        })?;
        debug!(command = %command.join(" "), "Docker compose configuration loaded");
        engine.emit(COMPOSE_CONFIG, &EventArgs::new().kwarg("config", config.clone()))?;
        Ok(config)
    }
}

/// IP address the docker daemon publishes ports on.
///
/// Only `tcp://`-style hosts carry an address; an unset or `unix://` host
/// means the local daemon.
fn host_ip(docker_host: Option<&str>) -> RigupResult<Ipv4Addr> {
    let Some(host) = docker_host.filter(|h| !h.is_empty()) else {
        return Ok(Ipv4Addr::LOCALHOST);
    };
    let Some((scheme, rest)) = host.split_once("://") else {
        return Err(invalid_host(host));
    };
    if scheme == "unix" || scheme == "npipe" {
        return Ok(Ipv4Addr::LOCALHOST);
    }

    let address = rest.split([':', '/']).next().unwrap_or_default();
    address.parse().map_err(|_| invalid_host(host))
}

fn invalid_host(host: &str) -> RigupError {
    ApplicationError::AutoConfigure {
        feature: NAME.into(),
        key: "ip".into(),
        reason: format!("Can't get ip address from DOCKER_HOST '{host}'"),
    }
    .into()
}

/// Stable three-digit prefix derived from the project name.
pub fn port_prefix(project_name: &str) -> u32 {
    Sha256::digest(project_name.as_bytes())
        .iter()
        .fold(0u32, |acc, &b| (acc * 256 + u32::from(b)) % 1000)
}

/// Lowercase and keep only `[-_a-z0-9]`, as docker-compose does.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_'))
        .collect()
}

fn basename(path: &Path) -> String {
    let absolute: PathBuf = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(unix)]
fn owner_ids(path: &Path) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;

    std::fs::metadata(path)
        .map(|m| (m.uid(), m.gid()))
        .unwrap_or((DEFAULT_ID, DEFAULT_ID))
}

#[cfg(not(unix))]
fn owner_ids(_path: &Path) -> (u32, u32) {
    (DEFAULT_ID, DEFAULT_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_socket_hosts_are_local() {
        assert_eq!(host_ip(None).unwrap(), Ipv4Addr::LOCALHOST);
        assert_eq!(
            host_ip(Some("unix:///var/run/docker.sock")).unwrap(),
            Ipv4Addr::LOCALHOST
        );
    }

    #[test]
    fn tcp_host_yields_its_address() {
        assert_eq!(
            host_ip(Some("tcp://192.168.99.100:2376")).unwrap(),
            Ipv4Addr::new(192, 168, 99, 100)
        );
    }

    #[test]
    fn hostname_is_an_auto_configure_error() {
        let err = host_ip(Some("tcp://docker.local:2376")).unwrap_err();
        assert!(matches!(
            err,
            RigupError::Application(ApplicationError::AutoConfigure { .. })
        ));
        assert!(err.is_startup_error());
    }

    #[test]
    fn port_prefix_is_stable_and_bounded() {
        let a = port_prefix("my-app");
        assert_eq!(a, port_prefix("my-app"));
        assert!(a < 1000);
    }

    #[test]
    fn compose_config_defaults_to_the_docker_cli() {
        let config: DockerConfig = serde_json::from_value(serde_json::json!({
            "compose": {"project_name": "app"}
        }))
        .unwrap();
        assert_eq!(
            config.compose.config_command,
            ["docker", "compose", "config", "--format", "json"]
        );
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("My App.v2"), "myappv2");
        assert_eq!(normalize_name("front_end-1"), "front_end-1");
    }
}
