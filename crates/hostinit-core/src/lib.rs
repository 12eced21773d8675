pub mod actions;
pub mod config;
pub mod error;
pub mod host;
pub mod io;
pub mod metadata;
pub mod orchestrator;
pub mod osutils;
pub mod paths;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{HostInitError, Result};
