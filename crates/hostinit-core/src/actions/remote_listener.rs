use crate::config::Config;
use crate::metadata::MetadataService;
use crate::orchestrator::{Action, ActionError, ActionResult, Requirements, SharedContext};
use crate::osutils::{OsUtils, Protocol, ServiceStartMode, ServiceStatus};

use super::REMOTE_LISTENER;

/// Enables the remote management service and opens its HTTPS listener port.
///
/// By default this targets the Windows WinRM service on Vista / Server 2008
/// (6.0) or later and is skipped elsewhere. With `remote_listener.platform`
/// set to `linux` it enables and starts the systemd unit `service_name`
/// through the same `OsUtils` calls.
pub struct RemoteListener {
    service_name: String,
    port: u16,
    enable_basic_auth: bool,
    platform: String,
    min_os_version: Option<(u32, u32)>,
}

impl RemoteListener {
    pub fn new(config: &Config) -> Self {
        let listener = &config.remote_listener;
        Self {
            service_name: listener.service_name.clone(),
            port: listener.port,
            enable_basic_auth: listener.enable_basic_auth,
            platform: listener.platform.clone(),
            min_os_version: listener.min_os_version,
        }
    }

    fn rule_name(&self) -> String {
        format!("{} HTTPS", self.service_name)
    }
}

impl Action for RemoteListener {
    fn identity(&self) -> &str {
        REMOTE_LISTENER
    }

    fn requirements(&self) -> Requirements {
        let req = Requirements::platform(self.platform.as_str());
        match self.min_os_version {
            Some((major, minor)) => req.with_min_os_version(major, minor),
            None => req,
        }
    }

    fn run(
        &self,
        _service: &dyn MetadataService,
        os: &dyn OsUtils,
        _ctx: &mut SharedContext,
    ) -> Result<ActionResult, ActionError> {
        let name = self.service_name.as_str();
        if !os.service_exists(name)? {
            tracing::warn!(service = %name, "management service not available, retrying next boot");
            return Ok(ActionResult::next_boot());
        }

        match os.get_service_start_mode(name)? {
            ServiceStartMode::Manual | ServiceStartMode::Disabled => {
                os.set_service_start_mode(name, ServiceStartMode::Automatic)?;
            }
            ServiceStartMode::Automatic => {}
        }
        if os.get_service_status(name)? == ServiceStatus::Stopped {
            os.start_service(name)?;
        }

        os.firewall_create_rule(&self.rule_name(), self.port, Protocol::Tcp)?;
        tracing::info!(
            service = %name,
            port = self.port,
            basic_auth = self.enable_basic_auth,
            "remote listener configured"
        );
        Ok(ActionResult::done())
    }
}
