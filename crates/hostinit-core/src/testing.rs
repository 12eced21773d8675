//! In-memory fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use crate::error::{HostInitError, Result};
use crate::metadata::{MetaData, MetadataService};
use crate::orchestrator::{
    Action, ActionError, ActionResult, ContextKey, Requirements, SharedContext,
};
use crate::osutils::{
    OsUtils, Protocol, ServiceStartMode, ServiceStatus, StaticNetworkConfig,
};

// ---------------------------------------------------------------------------
// FakeOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCall {
    Static(String, StaticNetworkConfig),
    Dhcp(String),
}

#[derive(Default)]
pub struct FakeOs {
    values: RefCell<BTreeMap<(String, String), String>>,
    version: Cell<(u32, u32)>,
    version_checks: Cell<u32>,
    reboots: Cell<u32>,
    terminations: Cell<u32>,
    nothing_to_stop: Cell<bool>,
    boot_waits: Cell<u32>,
    fail_reboot: Cell<bool>,
    fail_status_reads: Cell<bool>,
    fail_status_writes: Cell<bool>,
    users: RefCell<HashMap<String, Vec<String>>>,
    passwords: RefCell<HashMap<String, String>>,
    adapters: RefCell<Vec<String>>,
    network: RefCell<Vec<NetworkCall>>,
    network_reboot: Cell<bool>,
    services: RefCell<HashMap<String, (ServiceStartMode, ServiceStatus)>>,
    firewall: RefCell<Vec<(String, u16, Protocol)>>,
}

impl FakeOs {
    pub fn new() -> Self {
        let os = Self::default();
        os.version.set((10, 0));
        os
    }

    pub fn set_os_version(&self, major: u32, minor: u32) {
        self.version.set((major, minor));
    }

    pub fn version_checks(&self) -> u32 {
        self.version_checks.get()
    }

    pub fn reboots(&self) -> u32 {
        self.reboots.get()
    }

    pub fn terminations(&self) -> u32 {
        self.terminations.get()
    }

    /// Behave like a host with no hosting service configured.
    pub fn nothing_to_stop(&self) {
        self.nothing_to_stop.set(true);
    }

    pub fn boot_waits(&self) -> u32 {
        self.boot_waits.get()
    }

    pub fn fail_reboot(&self) {
        self.fail_reboot.set(true);
    }

    pub fn fail_status_reads(&self) {
        self.fail_status_reads.set(true);
    }

    pub fn fail_status_writes(&self) {
        self.fail_status_writes.set(true);
    }

    pub fn config_value(&self, key: &str, section: &str) -> Option<String> {
        self.values
            .borrow()
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }

    pub fn add_user(&self, name: &str) {
        self.users.borrow_mut().insert(name.to_string(), Vec::new());
    }

    pub fn user_groups(&self, name: &str) -> Option<Vec<String>> {
        self.users.borrow().get(name).cloned()
    }

    pub fn password_of(&self, name: &str) -> Option<String> {
        self.passwords.borrow().get(name).cloned()
    }

    pub fn set_adapters(&self, adapters: &[&str]) {
        *self.adapters.borrow_mut() = adapters.iter().map(|s| s.to_string()).collect();
    }

    pub fn network_calls(&self) -> Vec<NetworkCall> {
        self.network.borrow().clone()
    }

    pub fn network_changes_need_reboot(&self, reboot: bool) {
        self.network_reboot.set(reboot);
    }

    pub fn add_service(&self, name: &str, mode: ServiceStartMode, status: ServiceStatus) {
        self.services
            .borrow_mut()
            .insert(name.to_string(), (mode, status));
    }

    pub fn service(&self, name: &str) -> Option<(ServiceStartMode, ServiceStatus)> {
        self.services.borrow().get(name).copied()
    }

    pub fn firewall_rules(&self) -> Vec<(String, u16, Protocol)> {
        self.firewall.borrow().clone()
    }

    fn missing_service(name: &str) -> HostInitError {
        HostInitError::CommandFailed {
            command: "service".to_string(),
            reason: format!("no such service: {name}"),
        }
    }
}

impl OsUtils for FakeOs {
    fn wait_for_boot_completion(&self) -> Result<()> {
        self.boot_waits.set(self.boot_waits.get() + 1);
        Ok(())
    }

    fn get_config_value(&self, key: &str, section: &str) -> Result<Option<String>> {
        if self.fail_status_reads.get() {
            return Err(HostInitError::StatusDb("read failed".to_string()));
        }
        Ok(self.config_value(key, section))
    }

    fn set_config_value(&self, key: &str, value: &str, section: &str) -> Result<()> {
        if self.fail_status_writes.get() {
            return Err(HostInitError::StatusDb("write failed".to_string()));
        }
        self.values
            .borrow_mut()
            .insert((section.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn remove_config_value(&self, key: &str, section: &str) -> Result<bool> {
        Ok(self
            .values
            .borrow_mut()
            .remove(&(section.to_string(), key.to_string()))
            .is_some())
    }

    fn check_os_version(&self, major: u32, minor: u32) -> bool {
        self.version_checks.set(self.version_checks.get() + 1);
        self.version.get() >= (major, minor)
    }

    fn reboot(&self) -> Result<()> {
        self.reboots.set(self.reboots.get() + 1);
        if self.fail_reboot.get() {
            return Err(HostInitError::CommandFailed {
                command: "reboot".to_string(),
                reason: "permission denied".to_string(),
            });
        }
        Ok(())
    }

    fn terminate(&self) -> Result<bool> {
        self.terminations.set(self.terminations.get() + 1);
        Ok(!self.nothing_to_stop.get())
    }

    fn user_exists(&self, username: &str) -> Result<bool> {
        Ok(self.users.borrow().contains_key(username))
    }

    fn create_user(&self, username: &str, groups: &[String]) -> Result<()> {
        self.users
            .borrow_mut()
            .insert(username.to_string(), groups.to_vec());
        Ok(())
    }

    fn set_user_password(&self, username: &str, password: &str) -> Result<()> {
        self.passwords
            .borrow_mut()
            .insert(username.to_string(), password.to_string());
        Ok(())
    }

    fn generate_random_password(&self, length: usize) -> String {
        "Rand0m!".chars().cycle().take(length).collect()
    }

    fn get_network_adapters(&self) -> Result<Vec<String>> {
        Ok(self.adapters.borrow().clone())
    }

    fn set_static_network_config(
        &self,
        adapter: &str,
        config: &StaticNetworkConfig,
    ) -> Result<bool> {
        self.network
            .borrow_mut()
            .push(NetworkCall::Static(adapter.to_string(), config.clone()));
        Ok(self.network_reboot.get())
    }

    fn set_dhcp_network_config(&self, adapter: &str) -> Result<bool> {
        self.network
            .borrow_mut()
            .push(NetworkCall::Dhcp(adapter.to_string()));
        Ok(self.network_reboot.get())
    }

    fn service_exists(&self, name: &str) -> Result<bool> {
        Ok(self.services.borrow().contains_key(name))
    }

    fn get_service_start_mode(&self, name: &str) -> Result<ServiceStartMode> {
        self.service(name)
            .map(|(mode, _)| mode)
            .ok_or_else(|| Self::missing_service(name))
    }

    fn set_service_start_mode(&self, name: &str, mode: ServiceStartMode) -> Result<()> {
        let mut services = self.services.borrow_mut();
        let entry = services
            .get_mut(name)
            .ok_or_else(|| Self::missing_service(name))?;
        entry.0 = mode;
        Ok(())
    }

    fn get_service_status(&self, name: &str) -> Result<ServiceStatus> {
        self.service(name)
            .map(|(_, status)| status)
            .ok_or_else(|| Self::missing_service(name))
    }

    fn start_service(&self, name: &str) -> Result<()> {
        let mut services = self.services.borrow_mut();
        let entry = services
            .get_mut(name)
            .ok_or_else(|| Self::missing_service(name))?;
        entry.1 = ServiceStatus::Running;
        Ok(())
    }

    fn firewall_create_rule(&self, name: &str, port: u16, protocol: Protocol) -> Result<()> {
        self.firewall
            .borrow_mut()
            .push((name.to_string(), port, protocol));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeMetadata
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMetadata {
    pub meta: MetaData,
    pub contents: HashMap<String, String>,
    cleanups: Rc<Cell<u32>>,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meta(meta: MetaData) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn with_content(mut self, name: &str, body: &str) -> Self {
        self.contents.insert(name.to_string(), body.to_string());
        self
    }

    pub fn cleanups(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.cleanups)
    }
}

impl MetadataService for FakeMetadata {
    fn name(&self) -> &str {
        "fake"
    }

    fn load(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn get_meta_data(&self, _version: &str) -> Result<MetaData> {
        Ok(self.meta.clone())
    }

    fn get_content(&self, name: &str) -> Result<String> {
        self.contents
            .get(name)
            .cloned()
            .ok_or_else(|| HostInitError::MetadataNotFound(name.to_string()))
    }

    fn cleanup(&mut self) {
        self.cleanups.set(self.cleanups.get() + 1);
    }
}

// ---------------------------------------------------------------------------
// FakeAction
// ---------------------------------------------------------------------------

pub enum Behavior {
    Return(ActionResult),
    Fail(String),
    Panic,
}

/// Scriptable action. Invocations are appended to a shared call log so tests
/// can assert order across several actions.
pub struct FakeAction {
    id: String,
    requirements: Requirements,
    requirements_panic: bool,
    behavior: Behavior,
    publish: Vec<(ContextKey, String)>,
    reads: Vec<ContextKey>,
    seen: Rc<RefCell<Vec<(ContextKey, Option<String>)>>>,
    log: Rc<RefCell<Vec<String>>>,
}

impl FakeAction {
    pub fn new(id: &str, behavior: Behavior) -> Self {
        Self {
            id: id.to_string(),
            requirements: Requirements::none(),
            requirements_panic: false,
            behavior,
            publish: Vec::new(),
            reads: Vec::new(),
            seen: Rc::default(),
            log: Rc::default(),
        }
    }

    pub fn done(id: &str) -> Self {
        Self::new(id, Behavior::Return(ActionResult::done()))
    }

    pub fn rebooting(id: &str) -> Self {
        Self::new(id, Behavior::Return(ActionResult::done_with_reboot(true)))
    }

    pub fn next_boot(id: &str) -> Self {
        Self::new(id, Behavior::Return(ActionResult::next_boot()))
    }

    pub fn failing(id: &str, message: &str) -> Self {
        Self::new(id, Behavior::Fail(message.to_string()))
    }

    pub fn panicking(id: &str) -> Self {
        Self::new(id, Behavior::Panic)
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Panic from `requirements()`, which the orchestrator calls outside its
    /// per-action panic isolation.
    pub fn panicking_in_requirements(mut self) -> Self {
        self.requirements_panic = true;
        self
    }

    pub fn publishing(mut self, key: ContextKey, value: &str) -> Self {
        self.publish.push((key, value.to_string()));
        self
    }

    pub fn reading(mut self, key: ContextKey) -> Self {
        self.reads.push(key);
        self
    }

    pub fn logging_to(mut self, log: &Rc<RefCell<Vec<String>>>) -> Self {
        self.log = Rc::clone(log);
        self
    }

    /// Context values observed by `reading` keys, in invocation order.
    pub fn seen(&self) -> Rc<RefCell<Vec<(ContextKey, Option<String>)>>> {
        Rc::clone(&self.seen)
    }
}

impl Action for FakeAction {
    fn identity(&self) -> &str {
        &self.id
    }

    fn requirements(&self) -> Requirements {
        if self.requirements_panic {
            panic!("{} has bad requirements", self.id);
        }
        self.requirements.clone()
    }

    fn run(
        &self,
        _service: &dyn MetadataService,
        _os: &dyn OsUtils,
        ctx: &mut SharedContext,
    ) -> std::result::Result<ActionResult, ActionError> {
        self.log.borrow_mut().push(self.id.clone());
        for key in &self.reads {
            self.seen
                .borrow_mut()
                .push((*key, ctx.get(*key).map(String::from)));
        }
        for (key, value) in &self.publish {
            ctx.publish(*key, value.clone())?;
        }
        match &self.behavior {
            Behavior::Return(result) => Ok(*result),
            Behavior::Fail(message) => Err(ActionError::msg(message.clone())),
            Behavior::Panic => panic!("{} blew up", self.id),
        }
    }
}

/// Identities present in `log`, deduplicated, for "was it ever called" checks.
pub fn called(log: &Rc<RefCell<Vec<String>>>) -> HashSet<String> {
    log.borrow().iter().cloned().collect()
}
