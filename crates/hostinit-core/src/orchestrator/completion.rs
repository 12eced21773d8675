//! What happens after the action loop: reboot, stop the service, or return.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::osutils::OsUtils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPolicy {
    pub allow_reboot: bool,
    pub stop_service_on_exit: bool,
}

impl CompletionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allow_reboot: config.allow_reboot,
            stop_service_on_exit: config.stop_service_on_exit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// Reboot was requested and issued.
    Rebooting,
    /// Reboot was requested but the call failed; the process exits normally.
    RebootFailed { reason: String },
    /// The hosting service was asked to stop.
    Terminated,
    /// Termination was requested but the call failed.
    TerminateFailed { reason: String },
    /// Nothing to do, or no hosting service to stop; control returns to
    /// the caller.
    Returned,
}

impl CompletionPolicy {
    /// Apply the policy. Errors from the OS are logged and reported in the
    /// returned `Completion`, never propagated.
    pub fn apply(&self, os: &dyn OsUtils, reboot_required: bool) -> Completion {
        if reboot_required && self.allow_reboot {
            return match os.reboot() {
                Ok(()) => Completion::Rebooting,
                Err(e) => {
                    tracing::error!(error = %e, "reboot failed");
                    Completion::RebootFailed {
                        reason: e.to_string(),
                    }
                }
            };
        }

        if reboot_required {
            tracing::info!("reboot requested but not allowed, deferring to next boot");
        }

        if self.stop_service_on_exit {
            return match os.terminate() {
                Ok(true) => Completion::Terminated,
                Ok(false) => Completion::Returned,
                Err(e) => {
                    tracing::error!(error = %e, "failed to stop hosting service");
                    Completion::TerminateFailed {
                        reason: e.to_string(),
                    }
                }
            };
        }

        Completion::Returned
    }
}
