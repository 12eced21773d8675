//! OS abstraction consumed by the orchestrator and by actions.
//!
//! The orchestrator only needs boot-wait, config values, version checks,
//! reboot, and terminate. The remaining methods exist for the actions in
//! `crate::actions`.

pub mod db;
pub mod linux;

pub use db::ConfigDb;
pub use linux::LinuxOsUtils;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStartMode {
    Automatic,
    Manual,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static IPv4 settings for one adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticNetworkConfig {
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub broadcast: Option<String>,
    pub gateway: Option<String>,
    pub dns_nameservers: Vec<String>,
}

// ---------------------------------------------------------------------------
// OsUtils
// ---------------------------------------------------------------------------

pub trait OsUtils {
    // -- orchestrator-facing ------------------------------------------------

    /// Block until the host reports that boot has finished.
    fn wait_for_boot_completion(&self) -> Result<()>;

    fn get_config_value(&self, key: &str, section: &str) -> Result<Option<String>>;

    fn set_config_value(&self, key: &str, value: &str, section: &str) -> Result<()>;

    /// Returns true if a value was removed.
    fn remove_config_value(&self, key: &str, section: &str) -> Result<bool>;

    /// True when the running OS version is at least `major.minor`.
    fn check_os_version(&self, major: u32, minor: u32) -> bool;

    fn reboot(&self) -> Result<()>;

    /// Stop the hosting process or service. Returns false when there is
    /// nothing to stop and the process simply exits on return.
    fn terminate(&self) -> Result<bool>;

    // -- users --------------------------------------------------------------

    fn user_exists(&self, username: &str) -> Result<bool>;

    fn create_user(&self, username: &str, groups: &[String]) -> Result<()>;

    fn set_user_password(&self, username: &str, password: &str) -> Result<()>;

    fn generate_random_password(&self, length: usize) -> String;

    // -- network ------------------------------------------------------------

    fn get_network_adapters(&self) -> Result<Vec<String>>;

    /// Returns true if a reboot is needed for the change to apply.
    fn set_static_network_config(&self, adapter: &str, config: &StaticNetworkConfig)
        -> Result<bool>;

    /// Returns true if a reboot is needed for the change to apply.
    fn set_dhcp_network_config(&self, adapter: &str) -> Result<bool>;

    // -- services -----------------------------------------------------------

    fn service_exists(&self, name: &str) -> Result<bool>;

    fn get_service_start_mode(&self, name: &str) -> Result<ServiceStartMode>;

    fn set_service_start_mode(&self, name: &str, mode: ServiceStartMode) -> Result<()>;

    fn get_service_status(&self, name: &str) -> Result<ServiceStatus>;

    fn start_service(&self, name: &str) -> Result<()>;

    fn firewall_create_rule(&self, name: &str, port: u16, protocol: Protocol) -> Result<()>;
}
