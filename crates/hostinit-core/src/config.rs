use crate::actions;
use crate::error::{HostInitError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// MetadataConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    ConfigDrive,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDriveConfig {
    #[serde(default = "default_config_drive_path")]
    pub path: PathBuf,
}

fn default_config_drive_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_CONFIG_DRIVE)
}

impl Default for ConfigDriveConfig {
    fn default() -> Self {
        Self {
            path: default_config_drive_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Additional attempts after the first failed request.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_base_url() -> String {
    "http://169.254.169.254".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            retries: default_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Tried in order; the first service that loads wins.
    #[serde(default = "default_services")]
    pub services: Vec<MetadataKind>,
    #[serde(default)]
    pub config_drive: ConfigDriveConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_services() -> Vec<MetadataKind> {
    vec![MetadataKind::ConfigDrive, MetadataKind::Http]
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            services: default_services(),
            config_drive: ConfigDriveConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteListenerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteListenerConfig {
    #[serde(default = "default_listener_service")]
    pub service_name: String,
    #[serde(default = "default_listener_port")]
    pub port: u16,
    /// Only meaningful for the Windows management listener; other
    /// platforms log it.
    #[serde(default = "default_true")]
    pub enable_basic_auth: bool,
    /// Platform the action runs on. Set to `linux` to manage a systemd
    /// unit named `service_name` instead.
    #[serde(default = "default_listener_platform")]
    pub platform: String,
    /// Minimum OS version as `[major, minor]`; kernel release on Linux.
    /// `null` disables the check.
    #[serde(default = "default_listener_min_os_version")]
    pub min_os_version: Option<(u32, u32)>,
}

fn default_listener_service() -> String {
    "WinRM".to_string()
}

fn default_listener_port() -> u16 {
    5986
}

fn default_listener_platform() -> String {
    "windows".to_string()
}

fn default_listener_min_os_version() -> Option<(u32, u32)> {
    Some((6, 0))
}

impl Default for RemoteListenerConfig {
    fn default() -> Self {
        Self {
            service_name: default_listener_service(),
            port: default_listener_port(),
            enable_basic_auth: true,
            platform: default_listener_platform(),
            min_os_version: default_listener_min_os_version(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Honor reboots requested by actions. When false the reboot is deferred
    /// to the next boot and the run continues.
    #[serde(default = "default_true")]
    pub allow_reboot: bool,
    /// Stop the hosting service when the run ends without a reboot.
    #[serde(default = "default_true")]
    pub stop_service_on_exit: bool,
    /// systemd unit hosting the agent, stopped on exit when set. Run it as a
    /// unit ordered after the boot transaction (or pass `run --no-wait`);
    /// a `Type=oneshot` unit inside it only gets past the boot wait through
    /// `boot_wait_timeout_seconds`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Upper bound on waiting for the host to finish booting.
    #[serde(default = "default_boot_wait_timeout")]
    pub boot_wait_timeout_seconds: u64,
    #[serde(default = "default_state_db")]
    pub state_db: PathBuf,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default = "default_true")]
    pub inject_user_password: bool,
    /// Adapter to configure; the host's adapters are used in order when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_adapter: Option<String>,
    #[serde(default = "default_network_dir")]
    pub network_dir: PathBuf,
    #[serde(default)]
    pub remote_listener: RemoteListenerConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Actions to run, in order.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_boot_wait_timeout() -> u64 {
    300
}

fn default_state_db() -> PathBuf {
    PathBuf::from(paths::DEFAULT_STATE_DB)
}

fn default_username() -> String {
    "Admin".to_string()
}

fn default_network_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_NETWORK_DIR)
}

fn default_actions() -> Vec<String> {
    actions::ALL.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_reboot: true,
            stop_service_on_exit: true,
            service_name: None,
            boot_wait_timeout_seconds: default_boot_wait_timeout(),
            state_db: default_state_db(),
            username: default_username(),
            groups: Vec::new(),
            inject_user_password: true,
            network_adapter: None,
            network_dir: default_network_dir(),
            remote_listener: RemoteListenerConfig::default(),
            metadata: MetadataConfig::default(),
            actions: default_actions(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HostInitError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// A freshly imaged host may boot before anyone has written a config
    /// file; the defaults describe a complete run.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(HostInitError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for name in &self.actions {
            if !actions::is_known(name) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("unknown action '{name}' in actions"),
                });
            }
            if !seen.insert(name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("action '{name}' is listed more than once"),
                });
            }
        }

        if self.actions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no actions configured; runs will only apply the exit policy"
                    .to_string(),
            });
        }

        if self.metadata.services.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "metadata.services is empty; no metadata service can load".to_string(),
            });
        }

        if self.remote_listener.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "remote_listener.port must be non-zero".to_string(),
            });
        }

        if self.remote_listener.platform.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "remote_listener.platform must not be empty".to_string(),
            });
        }

        if self.boot_wait_timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "boot_wait_timeout_seconds is 0; runs will not wait for boot \
                          to finish"
                    .to_string(),
            });
        }

        if self.username.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "username must not be empty".to_string(),
            });
        }

        if !self.allow_reboot && self.actions.iter().any(|a| a == actions::NETWORK_CONFIG) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "allow_reboot is false; network changes that need a reboot \
                          will only take effect on the next boot"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
