//! Action contract for the boot-time orchestrator.
//!
//! An `Action` is the atomic unit of provisioning: a stable identity (the
//! status-store key), optional platform requirements, and a `run` step that
//! reports an `Outcome` plus whether the host must reboot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HostInitError;
use crate::metadata::MetadataService;
use crate::osutils::OsUtils;

use super::context::SharedContext;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a successful action run.
///
/// Only `Done` makes the orchestrator skip the action on later boots. An
/// action that fails returns `Err` instead and no outcome is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Done,
    ExecuteOnNextBoot,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::ExecuteOnNextBoot => "execute_on_next_boot",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = HostInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "done" => Ok(Outcome::Done),
            "execute_on_next_boot" => Ok(Outcome::ExecuteOnNextBoot),
            _ => Err(HostInitError::InvalidOutcome(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub outcome: Outcome,
    pub reboot_required: bool,
}

impl ActionResult {
    pub fn done() -> Self {
        Self {
            outcome: Outcome::Done,
            reboot_required: false,
        }
    }

    pub fn done_with_reboot(reboot_required: bool) -> Self {
        Self {
            outcome: Outcome::Done,
            reboot_required,
        }
    }

    pub fn next_boot() -> Self {
        Self {
            outcome: Outcome::ExecuteOnNextBoot,
            reboot_required: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// Platform constraints checked before an action is invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Value of `std::env::consts::OS` the action needs, e.g. `"windows"`.
    pub platform: Option<String>,
    /// Minimum OS version as `(major, minor)`.
    pub min_os_version: Option<(u32, u32)>,
}

impl Requirements {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn platform(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            min_os_version: None,
        }
    }

    pub fn with_min_os_version(mut self, major: u32, minor: u32) -> Self {
        self.min_os_version = Some((major, minor));
        self
    }
}

// ---------------------------------------------------------------------------
// ActionError
// ---------------------------------------------------------------------------

/// Failure raised by an action run. The orchestrator logs it and moves on.
#[derive(Debug)]
pub struct ActionError {
    message: String,
    source: Option<HostInitError>,
}

impl ActionError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<HostInitError> for ActionError {
    fn from(e: HostInitError) -> Self {
        Self {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single provisioning step.
pub trait Action {
    /// Stable key used for status persistence. Must not change between
    /// releases or a done action will run again.
    fn identity(&self) -> &str;

    fn requirements(&self) -> Requirements {
        Requirements::none()
    }

    fn run(
        &self,
        service: &dyn MetadataService,
        os: &dyn OsUtils,
        ctx: &mut SharedContext,
    ) -> Result<ActionResult, ActionError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
