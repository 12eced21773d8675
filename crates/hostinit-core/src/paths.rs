use crate::error::{HostInitError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Default locations
// ---------------------------------------------------------------------------

pub const DEFAULT_CONFIG_FILE: &str = "/etc/hostinit/hostinit.yaml";
pub const DEFAULT_STATE_DB: &str = "/var/lib/hostinit/state.redb";
pub const DEFAULT_CONFIG_DRIVE: &str = "/mnt/config";
pub const DEFAULT_NETWORK_DIR: &str = "/etc/network/interfaces.d";

pub const OPENSTACK_DIR: &str = "openstack";
pub const CONTENT_DIR: &str = "content";
pub const META_DATA_FILE: &str = "meta_data.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<root>/openstack/<version>/meta_data.json`
pub fn meta_data_path(root: &Path, version: &str) -> PathBuf {
    root.join(OPENSTACK_DIR).join(version).join(META_DATA_FILE)
}

/// `<root>/openstack/content/<name>`
pub fn content_path(root: &Path, name: &str) -> PathBuf {
    root.join(OPENSTACK_DIR).join(CONTENT_DIR).join(name)
}

pub fn interface_stanza_path(network_dir: &Path, adapter: &str) -> PathBuf {
    network_dir.join(adapter)
}

// ---------------------------------------------------------------------------
// Action identity validation
// ---------------------------------------------------------------------------

static ACTION_ID_RE: OnceLock<Regex> = OnceLock::new();

fn action_id_re() -> &'static Regex {
    ACTION_ID_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9_\-]*[a-z0-9]$|^[a-z0-9]$").expect("static regex")
    })
}

/// Action identities double as status-store keys, so they must stay stable
/// and printable.
pub fn validate_action_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !action_id_re().is_match(id) {
        return Err(HostInitError::InvalidActionId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
