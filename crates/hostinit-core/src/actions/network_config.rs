//! Static/DHCP network setup from the metadata's Debian-style interfaces blob.
//!
//! The blob looks like:
//!
//! ```text
//! auto eth0
//! iface eth0 inet static
//!     address 10.0.0.5
//!     netmask 255.255.255.0
//!     gateway 10.0.0.1
//!     dns-nameservers 8.8.8.8 8.8.4.4
//! ```
//!
//! Stanzas are applied to adapters positionally: the first usable stanza to
//! the first adapter, and so on.

use crate::config::Config;
use crate::error::{HostInitError, Result};
use crate::metadata::{MetadataService, LATEST};
use crate::orchestrator::{Action, ActionError, ActionResult, SharedContext};
use crate::osutils::{OsUtils, StaticNetworkConfig};

use super::NETWORK_CONFIG;

// ---------------------------------------------------------------------------
// Interfaces parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceStanza {
    pub name: String,
    pub family: String,
    pub method: String,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub broadcast: Option<String>,
    pub gateway: Option<String>,
    pub hwaddress: Option<String>,
    pub dns_nameservers: Vec<String>,
    pub dns_search: Vec<String>,
    pub pre_up: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub post_down: Vec<String>,
}

impl InterfaceStanza {
    /// IPv4 stanzas with a method this action knows how to apply.
    pub fn is_supported(&self) -> bool {
        self.family == "inet" && matches!(self.method.as_str(), "static" | "manual" | "dhcp")
    }

    fn static_config(&self) -> StaticNetworkConfig {
        StaticNetworkConfig {
            address: self.address.clone(),
            netmask: self.netmask.clone(),
            broadcast: self.broadcast.clone(),
            gateway: self.gateway.clone(),
            dns_nameservers: self.dns_nameservers.clone(),
        }
    }
}

fn words(value: &str) -> Vec<String> {
    value.split_whitespace().map(String::from).collect()
}

/// Parse `iface` stanzas. Options outside a stanza and unknown keys
/// (`auto`, `allow-hotplug`, ...) are ignored.
pub fn parse_interfaces(text: &str) -> Result<Vec<InterfaceStanza>> {
    let mut stanzas = Vec::new();
    let mut current: Option<InterfaceStanza> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((k, v)) => (k, v.trim()),
            None => (line, ""),
        };

        if key == "iface" {
            let parts: Vec<&str> = value.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(HostInitError::Metadata(format!(
                    "network config line {}: expected 'iface <name> <family> <method>'",
                    lineno + 1
                )));
            }
            if let Some(done) = current.take() {
                stanzas.push(done);
            }
            current = Some(InterfaceStanza {
                name: parts[0].to_string(),
                family: parts[1].to_string(),
                method: parts[2].to_string(),
                ..InterfaceStanza::default()
            });
            continue;
        }

        let Some(iface) = current.as_mut() else {
            continue;
        };
        let single = || Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "address" => iface.address = single(),
            "netmask" => iface.netmask = single(),
            "broadcast" => iface.broadcast = single(),
            "gateway" => iface.gateway = single(),
            "hwaddress" => iface.hwaddress = single(),
            "dns-nameservers" => iface.dns_nameservers = words(value),
            "dns-search" => iface.dns_search = words(value),
            "pre-up" => iface.pre_up.push(value.to_string()),
            "up" => iface.up.push(value.to_string()),
            "down" => iface.down.push(value.to_string()),
            "post-down" => iface.post_down.push(value.to_string()),
            _ => {}
        }
    }

    if let Some(done) = current {
        stanzas.push(done);
    }
    Ok(stanzas)
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

pub struct NetworkConfig {
    adapter: Option<String>,
}

impl NetworkConfig {
    pub fn new(config: &Config) -> Self {
        Self {
            adapter: config.network_adapter.clone(),
        }
    }

    fn adapters(&self, os: &dyn OsUtils) -> Result<Vec<String>> {
        if let Some(adapter) = &self.adapter {
            return Ok(vec![adapter.clone()]);
        }
        let adapters = os.get_network_adapters()?;
        if adapters.is_empty() {
            return Err(HostInitError::NoNetworkAdapter);
        }
        Ok(adapters)
    }
}

impl Action for NetworkConfig {
    fn identity(&self) -> &str {
        NETWORK_CONFIG
    }

    fn run(
        &self,
        service: &dyn MetadataService,
        os: &dyn OsUtils,
        _ctx: &mut SharedContext,
    ) -> std::result::Result<ActionResult, ActionError> {
        let meta = service.get_meta_data(LATEST)?;
        let Some(name) = meta.network_content_name() else {
            tracing::debug!("metadata carries no network config");
            return Ok(ActionResult::done());
        };

        let content = service.get_content(name)?;
        tracing::debug!(content = %content, "network config content");

        let stanzas: Vec<InterfaceStanza> = parse_interfaces(&content)?
            .into_iter()
            .filter(|s| {
                let ok = s.is_supported();
                if !ok {
                    tracing::debug!(
                        iface = %s.name,
                        family = %s.family,
                        method = %s.method,
                        "skipping unsupported interface stanza"
                    );
                }
                ok
            })
            .collect();

        let adapters = self.adapters(os)?;
        let mut reboot_required = false;
        for (adapter, stanza) in adapters.iter().zip(&stanzas) {
            tracing::info!(adapter = %adapter, method = %stanza.method, "configuring network adapter");
            reboot_required |= match stanza.method.as_str() {
                "static" => os.set_static_network_config(adapter, &stanza.static_config())?,
                "dhcp" => os.set_dhcp_network_config(adapter)?,
                _ => false,
            };
        }

        Ok(ActionResult::done_with_reboot(reboot_required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetaData, NetworkConfigRef};
    use crate::testing::{FakeMetadata, FakeOs, NetworkCall};

    const SAMPLE: &str = "\
# generated
auto eth0
iface eth0 inet static
    address 10.0.0.5
    netmask 255.255.255.0
    broadcast 10.0.0.255
    gateway 10.0.0.1
    dns-nameservers 8.8.8.8 8.8.4.4
    up ip route add 10.1.0.0/16 via 10.0.0.254

iface eth1 inet6 static
    address fd00::5

iface eth2 inet dhcp
";

    fn metadata(content: &str) -> FakeMetadata {
        FakeMetadata::with_meta(MetaData {
            network_config: Some(NetworkConfigRef {
                content_path: Some("/content/0000".into()),
            }),
            ..MetaData::default()
        })
        .with_content("0000", content)
    }

    #[test]
    fn parses_stanzas_and_options() {
        let stanzas = parse_interfaces(SAMPLE).unwrap();
        assert_eq!(stanzas.len(), 3);

        let eth0 = &stanzas[0];
        assert_eq!(eth0.name, "eth0");
        assert_eq!(eth0.method, "static");
        assert_eq!(eth0.address.as_deref(), Some("10.0.0.5"));
        assert_eq!(eth0.broadcast.as_deref(), Some("10.0.0.255"));
        assert_eq!(eth0.dns_nameservers, vec!["8.8.8.8", "8.8.4.4"]);
        assert_eq!(eth0.up, vec!["ip route add 10.1.0.0/16 via 10.0.0.254"]);
        assert!(eth0.is_supported());

        assert!(!stanzas[1].is_supported());
        assert_eq!(stanzas[2].method, "dhcp");
    }

    #[test]
    fn malformed_iface_line_is_an_error() {
        let err = parse_interfaces("iface eth0 inet\n").unwrap_err();
        assert!(matches!(err, HostInitError::Metadata(m) if m.contains("line 1")));
    }

    #[test]
    fn no_network_config_is_done() {
        let os = FakeOs::new();
        let result = NetworkConfig::new(&Config::default())
            .run(&FakeMetadata::new(), &os, &mut SharedContext::new())
            .unwrap();
        assert_eq!(result, ActionResult::done());
        assert!(os.network_calls().is_empty());
    }

    #[test]
    fn applies_supported_stanzas_to_adapters_in_order() {
        let os = FakeOs::new();
        os.set_adapters(&["ens3", "ens4", "ens5"]);

        let result = NetworkConfig::new(&Config::default())
            .run(&metadata(SAMPLE), &os, &mut SharedContext::new())
            .unwrap();

        assert!(!result.reboot_required);
        let calls = os.network_calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            NetworkCall::Static(adapter, cfg) => {
                assert_eq!(adapter, "ens3");
                assert_eq!(cfg.gateway.as_deref(), Some("10.0.0.1"));
            }
            other => panic!("unexpected call {other:?}"),
        }
        assert_eq!(calls[1], NetworkCall::Dhcp("ens4".into()));
    }

    #[test]
    fn configured_adapter_takes_first_stanza_only() {
        let os = FakeOs::new();
        os.set_adapters(&["ens3", "ens4"]);
        os.network_changes_need_reboot(true);
        let cfg = Config {
            network_adapter: Some("eth9".into()),
            ..Config::default()
        };

        let result = NetworkConfig::new(&cfg)
            .run(&metadata(SAMPLE), &os, &mut SharedContext::new())
            .unwrap();

        assert!(result.reboot_required);
        let calls = os.network_calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], NetworkCall::Static(a, _) if a == "eth9"));
    }

    #[test]
    fn no_adapter_is_a_failure() {
        let os = FakeOs::new();
        let err = NetworkConfig::new(&Config::default())
            .run(&metadata(SAMPLE), &os, &mut SharedContext::new())
            .unwrap_err();
        assert_eq!(err.message(), "no network adapter available");
    }
}
