//! Instance metadata sources.
//!
//! Both services expose the OpenStack layout: a versioned `meta_data.json`
//! document plus opaque content blobs referenced from it (for example the
//! network configuration). `MetadataFactory` picks the first configured
//! service that loads.

pub mod config_drive;
pub mod http;

pub use config_drive::ConfigDriveService;
pub use http::HttpService;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{MetadataConfig, MetadataKind};
use crate::error::{HostInitError, Result};

pub const LATEST: &str = "latest";

// ---------------------------------------------------------------------------
// MetaData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfigRef {
    pub content_path: Option<String>,
}

/// The parts of `meta_data.json` the actions read. Unknown fields are kept
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub admin_pass: Option<String>,
    #[serde(default)]
    pub public_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub network_config: Option<NetworkConfigRef>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MetaData {
    /// Name of the network configuration blob, i.e. the last path segment of
    /// `network_config.content_path`.
    pub fn network_content_name(&self) -> Option<&str> {
        let path = self.network_config.as_ref()?.content_path.as_deref()?;
        path.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// MetadataService
// ---------------------------------------------------------------------------

pub trait MetadataService {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Probe the source. `Ok(false)` means "not available here, try the next
    /// one"; `Err` is reserved for unexpected failures.
    fn load(&mut self) -> Result<bool>;

    fn get_meta_data(&self, version: &str) -> Result<MetaData>;

    fn get_content(&self, name: &str) -> Result<String>;

    /// Release any resources. Called exactly once after the action loop.
    fn cleanup(&mut self) {}
}

// ---------------------------------------------------------------------------
// MetadataFactory
// ---------------------------------------------------------------------------

pub struct MetadataFactory;

impl MetadataFactory {
    /// Try each configured service in order and return the first that loads.
    pub fn load(config: &MetadataConfig) -> Result<Box<dyn MetadataService>> {
        let candidates = config.services.iter().map(|kind| -> Result<Box<dyn MetadataService>> {
            Ok(match kind {
                MetadataKind::ConfigDrive => {
                    Box::new(ConfigDriveService::new(config.config_drive.path.clone()))
                }
                MetadataKind::Http => Box::new(HttpService::new(&config.http)?),
            })
        });
        Self::first_loaded(candidates)
    }

    fn first_loaded<I>(candidates: I) -> Result<Box<dyn MetadataService>>
    where
        I: IntoIterator<Item = Result<Box<dyn MetadataService>>>,
    {
        for candidate in candidates {
            let mut service = match candidate {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to construct metadata service");
                    continue;
                }
            };
            match service.load() {
                Ok(true) => return Ok(service),
                Ok(false) => {
                    tracing::debug!(service = %service.name(), "metadata service not available");
                }
                Err(e) => {
                    tracing::warn!(service = %service.name(), error = %e, "metadata service failed to load");
                }
            }
        }
        Err(HostInitError::NoMetadataService)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
