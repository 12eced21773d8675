use crate::output::print_json;
use anyhow::Context;
use hostinit_core::orchestrator::{StatusStore, STATUS_SECTION};
use hostinit_core::osutils::LinuxOsUtils;
use hostinit_core::paths;
use std::path::Path;

pub fn run(config_path: &Path, action: Option<&str>, all: bool, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let os = LinuxOsUtils::new(&config).context("failed to open state db")?;
    let store = StatusStore::new(&os);

    let targets: Vec<String> = if all {
        // Every recorded entry, including actions no longer configured.
        os.db()
            .entries(STATUS_SECTION)
            .context("failed to list recorded actions")?
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    } else {
        let Some(id) = action else {
            anyhow::bail!("an action name or --all is required");
        };
        paths::validate_action_id(id)?;
        vec![id.to_string()]
    };

    let mut cleared = Vec::new();
    for id in &targets {
        if store
            .clear_status(id)
            .with_context(|| format!("failed to reset '{id}'"))?
        {
            cleared.push(id.as_str());
        }
    }

    if json {
        return print_json(&serde_json::json!({ "cleared": cleared }));
    }
    if cleared.is_empty() {
        println!("Nothing to reset.");
    } else {
        for id in &cleared {
            println!("Reset '{id}'.");
        }
    }
    Ok(())
}
