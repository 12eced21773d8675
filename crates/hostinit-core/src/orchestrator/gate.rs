//! Platform and OS-version eligibility checks.

use serde::{Deserialize, Serialize};

use crate::osutils::OsUtils;

use super::action::Requirements;

/// Facts about the running host that requirements are compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// `std::env::consts::OS` of the running binary, e.g. `"linux"`.
    pub os: String,
}

impl PlatformInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
        }
    }
}

/// Why an action was not eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligible {
    Platform,
    OsVersion,
}

/// Evaluate `req` against the running host. Never fails; the requirement
/// shape is validated when the action is registered.
pub fn check(
    action: &str,
    req: &Requirements,
    platform: &PlatformInfo,
    os: &dyn OsUtils,
) -> Result<(), Ineligible> {
    if let Some(required) = &req.platform {
        if *required != platform.os {
            tracing::debug!(
                action,
                required = %required,
                current = %platform.os,
                "skipping action: platform not supported"
            );
            return Err(Ineligible::Platform);
        }
    }
    if let Some((major, minor)) = req.min_os_version {
        if !os.check_os_version(major, minor) {
            tracing::debug!(
                action,
                min_version = %format!("{major}.{minor}"),
                "skipping action: OS version not supported"
            );
            return Err(Ineligible::OsVersion);
        }
    }
    Ok(())
}

pub fn eligible(action: &str, req: &Requirements, platform: &PlatformInfo, os: &dyn OsUtils) -> bool {
    check(action, req, platform, os).is_ok()
}
