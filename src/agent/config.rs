use std::{collections::BTreeMap, fs, io, path::Path};

use serde::Deserialize;

use crate::{error::AgentError, options::DEFAULT_PORT, steps::preflight};

/// Mounts bind-mounted into every container, hidden when the agent runs in one.
const CONTAINER_MOUNTPOINTS: [&str; 3] = ["/etc/hosts", "/etc/resolv.conf", "/etc/hostname"];

// ── Data types ────────────────────────────────────────────────────────────────

/// The agent's `agent.yml`, in the shape the installer writes it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub system: SystemRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Empty binds every interface.
    pub host: String,
    pub port: u16,
    /// Empty disables authentication.
    pub token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            token: String::new(),
        }
    }
}

/// What the telemetry snapshot should contain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemRequest {
    pub cpu_temp_sensor: String,
    pub hide_mountpoints_by_default: bool,
    pub mountpoints: BTreeMap<String, MountpointRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MountpointRequest {
    /// Display name; empty keeps the path.
    pub name: String,
    /// `None` falls back to `hide_mountpoints_by_default`.
    pub hide: Option<bool>,
}

impl SystemRequest {
    /// Display name for `path`, or `None` when it is hidden.
    pub fn visible_name(&self, path: &str) -> Option<String> {
        let entry = self.mountpoints.get(path);
        let hidden = entry
            .and_then(|e| e.hide)
            .unwrap_or(self.hide_mountpoints_by_default);
        if hidden {
            return None;
        }
        match entry {
            Some(e) if !e.name.is_empty() => Some(e.name.clone()),
            _ => Some(path.to_string()),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads `path`; a missing file means configuration comes from the
/// environment instead.
pub fn load(path: &Path) -> Result<AgentConfig, AgentError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse(&contents).map_err(|source| AgentError::ParseConfig {
            path: path.display().to_string(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} not found, reading configuration from environment", path.display());
            from_env(|key| std::env::var(key).ok(), preflight::is_inside_container())
        }
        Err(source) => Err(AgentError::ReadConfig {
            path: path.display().to_string(),
            source,
        }),
    }
}

pub fn parse(contents: &str) -> Result<AgentConfig, serde_yaml::Error> {
    serde_yaml::from_str(contents)
}

/// `PORT`, `TOKEN`, `TEMP_SENSOR`, `HIDE_MOUNTPOINTS_BY_DEFAULT` and
/// `MOUNTPOINTS` (`[!]path[:name]`, comma separated).
pub fn from_env<F>(var: F, inside_container: bool) -> Result<AgentConfig, AgentError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| var(key).filter(|v| !v.is_empty());

    let port = match var("PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| AgentError::InvalidPortEnv(raw))?,
        None => DEFAULT_PORT,
    };

    let mut system = SystemRequest {
        cpu_temp_sensor: var("TEMP_SENSOR").unwrap_or_default(),
        hide_mountpoints_by_default: var("HIDE_MOUNTPOINTS_BY_DEFAULT").as_deref() == Some("true"),
        mountpoints: BTreeMap::new(),
    };

    if inside_container && !system.hide_mountpoints_by_default {
        for path in CONTAINER_MOUNTPOINTS {
            system.mountpoints.insert(
                path.to_string(),
                MountpointRequest {
                    name: String::new(),
                    hide: Some(true),
                },
            );
        }
    }

    if let Some(list) = var("MOUNTPOINTS") {
        for spec in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (path, name) = spec.split_once(':').unwrap_or((spec, ""));
            let (path, hide) = match path.strip_prefix('!') {
                Some(rest) => (rest, true),
                None => (path, false),
            };
            system.mountpoints.insert(
                path.to_string(),
                MountpointRequest {
                    name: name.to_string(),
                    hide: Some(hide),
                },
            );
        }
    }

    Ok(AgentConfig {
        server: ServerConfig {
            port,
            token: var("TOKEN").unwrap_or_default(),
            ..ServerConfig::default()
        },
        system,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn parses_installer_generated_config() {
        let config = parse(
            "server:\n  port: 8080\n  token: abc\n\nsystem:\n  mountpoints:\n    \"/boot\":\n      hide: true\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.token, "abc");
        assert_eq!(config.system.mountpoints["/boot"].hide, Some(true));
        assert_eq!(config.system.visible_name("/boot"), None);
    }

    #[test]
    fn missing_port_defaults() {
        let config = parse("server:\n  token: abc\n").unwrap();
        assert_eq!(config.server.port, 27973);
        assert!(config.server.host.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_environment() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("agent.yml"));
        // PORT may be set in the test environment; only a bad value fails.
        assert!(config.is_ok() || matches!(config, Err(AgentError::InvalidPortEnv(_))));
    }

    #[test]
    fn unparsable_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yml");
        fs::write(&path, "server: [1, 2").unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().starts_with(&format!("parsing config {}", path.display())));
    }

    #[test]
    fn env_mountpoints_support_hide_and_rename() {
        let config = from_env(
            env(&[
                ("PORT", "9000"),
                ("TOKEN", "t"),
                ("MOUNTPOINTS", "/mnt/data:Data, !/boot ,, /srv"),
            ]),
            false,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.token, "t");
        let sys = &config.system;
        assert_eq!(sys.visible_name("/mnt/data").as_deref(), Some("Data"));
        assert_eq!(sys.visible_name("/boot"), None);
        assert_eq!(sys.visible_name("/srv").as_deref(), Some("/srv"));
        assert_eq!(sys.visible_name("/other").as_deref(), Some("/other"));
    }

    #[test]
    fn hide_by_default_applies_to_unlisted_mounts() {
        let config = from_env(
            env(&[("HIDE_MOUNTPOINTS_BY_DEFAULT", "true"), ("MOUNTPOINTS", "/data")]),
            true,
        )
        .unwrap();
        assert_eq!(config.system.visible_name("/"), None);
        assert_eq!(config.system.visible_name("/data").as_deref(), Some("/data"));
        assert!(!config.system.mountpoints.contains_key("/etc/hosts"));
    }

    #[test]
    fn container_mounts_are_hidden_inside_containers() {
        let config = from_env(env(&[]), true).unwrap();
        for path in CONTAINER_MOUNTPOINTS {
            assert_eq!(config.system.visible_name(path), None, "{path}");
        }
        assert_eq!(config.server.port, 27973);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = from_env(env(&[("PORT", "http")]), false).unwrap_err();
        assert_eq!(err.to_string(), "PORT must be a valid port number, got: http");
    }
}
