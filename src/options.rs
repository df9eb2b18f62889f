use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};

use crate::host::HostFacts;

pub const DEFAULT_PORT: u16 = 27973;
pub const DEFAULT_INSTALL_DIRECTORY: &str = "/opt/luna-agent";
pub const DEFAULT_SERVICE_PATH: &str = "/etc/systemd/system/luna-agent.service";
pub const TOKEN_LENGTH: usize = 32;

const UNKNOWN_ADDRESS: &str = "<insert IP address or domain of this server>";
const UNKNOWN_HOSTNAME: &str = "unnamed server";

/// Holds every installation parameter. Edited in place by the option editor,
/// then finalized and only read by the remaining steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub install_directory: PathBuf,
    pub binary_path: PathBuf,
    pub config_path: PathBuf,
    pub service_path: PathBuf,
    pub service_name: String,
    pub uninstall_script_path: PathBuf,
    pub local_address: String,
    pub hostname: String,
    /// Empty means authentication is disabled.
    pub auth_token: String,
    pub port: u16,
    pub hidden_mountpoints: Vec<String>,
    pub add_firewall_rule: bool,
    pub enable_service: bool,
    pub random_token: bool,
    pub custom_config_path: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_directory: PathBuf::from(DEFAULT_INSTALL_DIRECTORY),
            binary_path: PathBuf::new(),
            config_path: PathBuf::new(),
            service_path: PathBuf::from(DEFAULT_SERVICE_PATH),
            service_name: String::new(),
            uninstall_script_path: PathBuf::new(),
            local_address: UNKNOWN_ADDRESS.to_string(),
            hostname: UNKNOWN_HOSTNAME.to_string(),
            auth_token: String::new(),
            port: DEFAULT_PORT,
            hidden_mountpoints: Vec::new(),
            add_firewall_rule: false,
            enable_service: true,
            random_token: true,
            custom_config_path: false,
        }
    }
}

impl InstallOptions {
    /// Defaults seeded from what was detected on this host.
    pub fn from_host(facts: &HostFacts) -> Self {
        let defaults = Self::default();
        Self {
            local_address: facts
                .local_address
                .clone()
                .unwrap_or(defaults.local_address),
            hostname: facts.hostname.clone().unwrap_or(defaults.hostname),
            hidden_mountpoints: facts.hidden_mountpoints.clone(),
            add_firewall_rule: facts.has_firewall,
            ..Self::default()
        }
    }

    /// Config path as it will be used: custom if one was chosen, otherwise
    /// `agent.yml` inside the install directory.
    pub fn effective_config_path(&self) -> PathBuf {
        if self.custom_config_path {
            self.config_path.clone()
        } else {
            self.install_directory.join("agent.yml")
        }
    }

    /// Recomputes every derived field and draws the auth token. Called once,
    /// after the user confirmed.
    pub fn finalize(&mut self) {
        self.auth_token = if self.random_token {
            random_token(TOKEN_LENGTH)
        } else {
            String::new()
        };
        self.config_path = self.effective_config_path();
        self.binary_path = self.install_directory.join("agent");
        self.uninstall_script_path = self.install_directory.join("uninstall.sh");
        self.service_name = service_name(&self.service_path);
    }
}

/// `luna-agent` for `/etc/systemd/system/luna-agent.service`.
pub fn service_name(service_path: &Path) -> String {
    let base = service_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match base.strip_suffix(".service") {
        Some(stem) => stem.to_string(),
        None => base,
    }
}

/// `length` characters from `[a-zA-Z0-9]`, drawn from the thread CSPRNG.
pub fn random_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
