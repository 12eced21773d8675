use std::path::PathBuf;

use crate::error::{HostInitError, Result};
use crate::paths;

use super::{MetaData, MetadataService, LATEST};

/// Metadata read from a mounted config drive directory.
pub struct ConfigDriveService {
    root: PathBuf,
}

impl ConfigDriveService {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl MetadataService for ConfigDriveService {
    fn name(&self) -> &str {
        "config_drive"
    }

    fn load(&mut self) -> Result<bool> {
        Ok(paths::meta_data_path(&self.root, LATEST).is_file())
    }

    fn get_meta_data(&self, version: &str) -> Result<MetaData> {
        let path = paths::meta_data_path(&self.root, version);
        let data = crate::io::read_optional(&path)?
            .ok_or_else(|| HostInitError::MetadataNotFound(path.display().to_string()))?;
        Ok(serde_json::from_str(&data)?)
    }

    fn get_content(&self, name: &str) -> Result<String> {
        if name.contains('/') || name == ".." {
            return Err(HostInitError::Metadata(format!(
                "invalid content name: {name}"
            )));
        }
        let path = paths::content_path(&self.root, name);
        crate::io::read_optional(&path)?
            .ok_or_else(|| HostInitError::MetadataNotFound(path.display().to_string()))
    }
}
