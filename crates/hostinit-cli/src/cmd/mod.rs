pub mod config;
pub mod reset;
pub mod run;
pub mod status;

use anyhow::Context;
use hostinit_core::config::{Config, WarnLevel};
use std::path::Path;

/// Load the config, falling back to defaults when the file is absent.
pub(crate) fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Load the config and refuse to continue if validation reports errors.
pub(crate) fn load_valid_config(path: &Path) -> anyhow::Result<Config> {
    let config = load_config(path)?;
    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("invalid config; run `hostinit config validate` for details");
    }
    Ok(config)
}
