//! Top-level entry point: wait for boot, load metadata, run, complete.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::metadata::{MetadataFactory, MetadataService};
use crate::orchestrator::{
    Action, Completion, CompletionPolicy, Orchestrator, PlatformInfo, RunReport,
};
use crate::osutils::OsUtils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRun {
    pub report: RunReport,
    pub completion: Completion,
}

/// Configure the host with the metadata service chosen by `config`.
///
/// Fails only if boot completion cannot be awaited or no metadata service
/// loads; action failures are reported in `HostRun::report`.
pub fn configure_host(
    os: &dyn OsUtils,
    config: &Config,
    actions: &[Box<dyn Action>],
) -> Result<HostRun> {
    os.wait_for_boot_completion()?;
    let mut service = MetadataFactory::load(&config.metadata)?;
    tracing::info!(service = %service.name(), "metadata service loaded");
    Ok(configure_host_with(os, config, service.as_mut(), actions))
}

/// Same as `configure_host` with an already loaded metadata service.
pub fn configure_host_with(
    os: &dyn OsUtils,
    config: &Config,
    service: &mut dyn MetadataService,
    actions: &[Box<dyn Action>],
) -> HostRun {
    let orchestrator = Orchestrator::new(os, PlatformInfo::current(), config.allow_reboot);
    let report = orchestrator.run(service, actions);
    tracing::info!(
        failed = report.failure_count(),
        reboot_required = report.reboot_required,
        "action run finished"
    );
    let completion = CompletionPolicy::from_config(config).apply(os, report.reboot_required);
    HostRun { report, completion }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetadataKind;
    use crate::error::HostInitError;
    use crate::orchestrator::Disposition;
    use crate::testing::{FakeAction, FakeOs};
    use tempfile::TempDir;

    fn config_drive(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.metadata.services = vec![MetadataKind::ConfigDrive];
        config.metadata.config_drive.path = dir.path().join("drive");
        config
    }

    #[test]
    fn waits_for_boot_then_runs() {
        let dir = TempDir::new().unwrap();
        let md = crate::paths::meta_data_path(&dir.path().join("drive"), crate::metadata::LATEST);
        crate::io::atomic_write(&md, b"{}").unwrap();
        let os = FakeOs::new();
        let actions: Vec<Box<dyn Action>> = vec![Box::new(FakeAction::done("a"))];

        let host = configure_host(&os, &config_drive(&dir), &actions).unwrap();

        assert_eq!(os.boot_waits(), 1);
        assert_eq!(host.report.service, "config_drive");
        assert!(matches!(
            host.report.disposition("a"),
            Some(Disposition::Recorded { .. })
        ));
        assert_eq!(host.completion, Completion::Terminated);
    }

    #[test]
    fn no_metadata_service_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let os = FakeOs::new();
        let actions: Vec<Box<dyn Action>> = vec![Box::new(FakeAction::done("a"))];

        let err = configure_host(&os, &config_drive(&dir), &actions).err().unwrap();

        assert!(matches!(err, HostInitError::NoMetadataService));
        assert_eq!(os.terminations(), 0);
        assert_eq!(os.config_value("a", crate::orchestrator::STATUS_SECTION), None);
    }
}
