use crate::output::{print_json, print_table};
use anyhow::Context;
use hostinit_core::orchestrator::{ActionRegistry, Outcome, StatusStore};
use hostinit_core::osutils::LinuxOsUtils;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ActionStatus {
    action: String,
    status: Option<Outcome>,
}

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let registry = ActionRegistry::from_config(&config).context("failed to build actions")?;
    let os = LinuxOsUtils::new(&config).context("failed to open state db")?;
    let store = StatusStore::new(&os);

    let mut statuses = Vec::with_capacity(registry.len());
    for id in registry.identities() {
        let status = store
            .get_status(id)
            .with_context(|| format!("failed to read status of '{id}'"))?;
        statuses.push(ActionStatus {
            action: id.to_string(),
            status,
        });
    }

    if json {
        return print_json(&statuses);
    }

    if statuses.is_empty() {
        println!("No actions configured.");
        return Ok(());
    }
    let rows = statuses
        .iter()
        .map(|s| {
            let status = s.status.map_or("pending", Outcome::as_str);
            vec![s.action.clone(), status.to_string()]
        })
        .collect();
    print_table(&["ACTION", "STATUS"], rows);
    Ok(())
}
