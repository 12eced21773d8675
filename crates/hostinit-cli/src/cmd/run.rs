use crate::output::{print_json, print_table};
use anyhow::Context;
use hostinit_core::host::{configure_host, configure_host_with, HostRun};
use hostinit_core::metadata::MetadataFactory;
use hostinit_core::orchestrator::{ActionRegistry, Completion, Disposition};
use hostinit_core::osutils::LinuxOsUtils;
use std::path::Path;

pub fn run(config_path: &Path, no_wait: bool, json: bool) -> anyhow::Result<()> {
    let config = super::load_valid_config(config_path)?;
    let os = LinuxOsUtils::new(&config).context("failed to open state db")?;
    let registry = ActionRegistry::from_config(&config).context("failed to build actions")?;

    let host = if no_wait {
        let mut service =
            MetadataFactory::load(&config.metadata).context("failed to load metadata")?;
        configure_host_with(&os, &config, service.as_mut(), registry.actions())
    } else {
        configure_host(&os, &config, registry.actions()).context("failed to configure host")?
    };

    if json {
        print_json(&host)?;
    } else {
        print_human(&host);
    }
    Ok(())
}

fn print_human(host: &HostRun) {
    let report = &host.report;
    println!("Metadata service: {}", report.service);

    let rows = report
        .actions
        .iter()
        .map(|r| vec![r.action.clone(), disposition_display(&r.disposition)])
        .collect();
    print_table(&["ACTION", "RESULT"], rows);

    println!();
    println!(
        "Reboot required: {}{}",
        if report.reboot_required { "yes" } else { "no" },
        if report.stopped_early { " (remaining actions deferred)" } else { "" }
    );
    println!("Completion: {}", completion_display(&host.completion));
}

fn disposition_display(d: &Disposition) -> String {
    match d {
        Disposition::Skipped { reason } => format!("skipped ({reason})"),
        Disposition::Recorded {
            outcome,
            reboot_required: true,
        } => format!("{outcome} (reboot)"),
        Disposition::Recorded { outcome, .. } => outcome.to_string(),
        Disposition::Failed { error, defect } => {
            let kind = if *defect { "defect" } else { "failed" };
            format!("{kind}: {error}")
        }
        Disposition::NotReached => "not reached".to_string(),
    }
}

fn completion_display(c: &Completion) -> String {
    match c {
        Completion::Rebooting => "rebooting".to_string(),
        Completion::RebootFailed { reason } => format!("reboot failed: {reason}"),
        Completion::Terminated => "service stopped".to_string(),
        Completion::TerminateFailed { reason } => format!("stop failed: {reason}"),
        Completion::Returned => "returned".to_string(),
    }
}
