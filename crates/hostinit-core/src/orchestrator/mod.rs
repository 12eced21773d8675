//! Boot-time orchestrator.
//!
//! Provides the `Action` contract, the in-run `SharedContext`, the
//! requirement gate, the persisted `StatusStore`, the `Orchestrator` loop
//! and the post-run `CompletionPolicy`.

pub mod action;
pub mod completion;
pub mod context;
pub mod gate;
pub mod registry;
pub mod run;
pub mod status;

pub use action::{Action, ActionError, ActionResult, Outcome, Requirements};
pub use completion::{Completion, CompletionPolicy};
pub use context::{ContextKey, SharedContext};
pub use gate::PlatformInfo;
pub use registry::ActionRegistry;
pub use run::{ActionReport, Disposition, Orchestrator, RunReport, SkipReason};
pub use status::{StatusStore, STATUS_SECTION};
