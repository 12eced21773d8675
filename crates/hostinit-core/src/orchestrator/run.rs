//! The action loop.
//!
//! For each action in registration order:
//!
//! ```text
//! pending ─┬─► skipped (platform / os_version)      no status write
//!          ├─► skipped (already_done)               no status write
//!          └─► invoked ─┬─► recorded (outcome)      status written immediately
//!                       └─► failed                  no status write, loop continues
//! ```
//!
//! A recorded reboot request with `allow_reboot` set ends the loop; the
//! remaining actions are reported `not_reached` and run on the next boot.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::MetadataService;
use crate::osutils::OsUtils;

use super::action::{Action, ActionError, ActionResult, Outcome};
use super::context::SharedContext;
use super::gate::{self, Ineligible, PlatformInfo};
use super::status::StatusStore;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Platform,
    OsVersion,
    AlreadyDone,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Platform => "platform",
            SkipReason::OsVersion => "os_version",
            SkipReason::AlreadyDone => "already_done",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Ineligible> for SkipReason {
    fn from(i: Ineligible) -> Self {
        match i {
            Ineligible::Platform => SkipReason::Platform,
            Ineligible::OsVersion => SkipReason::OsVersion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Disposition {
    Skipped {
        reason: SkipReason,
    },
    Recorded {
        outcome: Outcome,
        reboot_required: bool,
    },
    /// The action returned an error, panicked (`defect`), or its status could
    /// not be read or written. Nothing was recorded.
    Failed {
        error: String,
        defect: bool,
    },
    /// Deferred by an earlier reboot request.
    NotReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub action: String,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub service: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub actions: Vec<ActionReport>,
    /// True if any invoked action asked for a reboot.
    pub reboot_required: bool,
    /// True if the loop ended early to honor a reboot.
    pub stopped_early: bool,
    /// Context keys published during the run.
    pub context_keys: Vec<String>,
}

impl RunReport {
    pub fn disposition(&self, action: &str) -> Option<&Disposition> {
        self.actions
            .iter()
            .find(|r| r.action == action)
            .map(|r| &r.disposition)
    }

    pub fn failure_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|r| matches!(r.disposition, Disposition::Failed { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Cleanup guard
// ---------------------------------------------------------------------------

/// Calls `MetadataService::cleanup` exactly once when dropped, including
/// while unwinding.
struct ServiceGuard<'s> {
    service: &'s mut dyn MetadataService,
}

impl Drop for ServiceGuard<'_> {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service.name(), "releasing metadata service");
        self.service.cleanup();
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    os: &'a dyn OsUtils,
    platform: PlatformInfo,
    allow_reboot: bool,
}

enum Invocation {
    Ok(ActionResult),
    Err(ActionError),
    Panicked(String),
}

impl<'a> Orchestrator<'a> {
    pub fn new(os: &'a dyn OsUtils, platform: PlatformInfo, allow_reboot: bool) -> Self {
        Self {
            os,
            platform,
            allow_reboot,
        }
    }

    /// Run every eligible, not-yet-done action once, in order.
    ///
    /// Never fails: per-action errors are logged and reported. The metadata
    /// service is released before this returns.
    pub fn run(&self, service: &mut dyn MetadataService, actions: &[Box<dyn Action>]) -> RunReport {
        let started_at = Utc::now();
        let guard = ServiceGuard { service };
        let service_name = guard.service.name().to_string();
        tracing::info!(service = %service_name, actions = actions.len(), "starting action run");

        let store = StatusStore::new(self.os);
        let mut ctx = SharedContext::new();
        let mut reports = Vec::with_capacity(actions.len());
        let mut reboot_required = false;
        let mut stopped_early = false;

        for action in actions {
            let id = action.identity();

            if stopped_early {
                reports.push(ActionReport {
                    action: id.to_string(),
                    disposition: Disposition::NotReached,
                });
                continue;
            }

            let (disposition, wants_reboot) =
                self.step(action.as_ref(), &*guard.service, &store, &mut ctx);
            if wants_reboot {
                reboot_required = true;
                if self.allow_reboot {
                    tracing::info!(action = %id, "reboot requested, deferring remaining actions");
                    stopped_early = true;
                }
            }
            reports.push(ActionReport {
                action: id.to_string(),
                disposition,
            });
        }

        drop(guard);

        RunReport {
            service: service_name,
            started_at,
            finished_at: Utc::now(),
            actions: reports,
            reboot_required,
            stopped_early,
            context_keys: ctx.keys().into_iter().map(String::from).collect(),
        }
    }

    fn step(
        &self,
        action: &dyn Action,
        service: &dyn MetadataService,
        store: &StatusStore<'_>,
        ctx: &mut SharedContext,
    ) -> (Disposition, bool) {
        let id = action.identity();

        if let Err(reason) = gate::check(id, &action.requirements(), &self.platform, self.os) {
            let disposition = Disposition::Skipped {
                reason: reason.into(),
            };
            return (disposition, false);
        }

        match store.get_status(id) {
            Ok(Some(Outcome::Done)) => {
                tracing::debug!(action = %id, "action already done, skipping");
                let disposition = Disposition::Skipped {
                    reason: SkipReason::AlreadyDone,
                };
                return (disposition, false);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(action = %id, error = %e, "failed to read action status");
                return (failed(e.to_string(), false), false);
            }
        }

        tracing::info!(action = %id, "executing action");
        let result = match self.invoke(action, service, ctx) {
            Invocation::Ok(result) => result,
            Invocation::Err(e) => {
                tracing::error!(action = %id, error = %e, "action failed");
                return (failed(e.to_string(), false), false);
            }
            Invocation::Panicked(msg) => {
                tracing::error!(action = %id, error = %msg, defect = true, "action panicked");
                return (failed(msg, true), false);
            }
        };

        if let Err(e) = store.set_status(id, result.outcome) {
            tracing::error!(action = %id, error = %e, "failed to record action status");
            // The host change is already applied, so its reboot request stands.
            return (failed(e.to_string(), false), result.reboot_required);
        }

        tracing::info!(
            action = %id,
            outcome = %result.outcome,
            reboot_required = result.reboot_required,
            "action completed"
        );
        let disposition = Disposition::Recorded {
            outcome: result.outcome,
            reboot_required: result.reboot_required,
        };
        (disposition, result.reboot_required)
    }

    fn invoke(
        &self,
        action: &dyn Action,
        service: &dyn MetadataService,
        ctx: &mut SharedContext,
    ) -> Invocation {
        let os = self.os;
        match panic::catch_unwind(AssertUnwindSafe(|| action.run(service, os, ctx))) {
            Ok(Ok(result)) => Invocation::Ok(result),
            Ok(Err(e)) => Invocation::Err(e),
            Err(payload) => Invocation::Panicked(panic_message(payload.as_ref())),
        }
    }
}

fn failed(error: String, defect: bool) -> Disposition {
    Disposition::Failed { error, defect }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "action panicked".to_string()
    }
}
