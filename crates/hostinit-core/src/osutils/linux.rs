//! `OsUtils` for systemd-based Linux hosts.
//!
//! System binaries are located with `which` at call time; a missing binary
//! surfaces as `HostInitError::CommandNotFound` so the calling action fails
//! and is retried on the next boot.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Config;
use crate::error::{HostInitError, Result};
use crate::paths;

use super::{ConfigDb, OsUtils, Protocol, ServiceStartMode, ServiceStatus, StaticNetworkConfig};

const PASSWD_FILE: &str = "/etc/passwd";
const OS_RELEASE_FILE: &str = "/proc/sys/kernel/osrelease";
const SYS_CLASS_NET: &str = "/sys/class/net";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{};:,.<>?";

pub struct LinuxOsUtils {
    db: ConfigDb,
    network_dir: PathBuf,
    service_name: Option<String>,
    boot_wait_timeout: Duration,
}

impl LinuxOsUtils {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            db: ConfigDb::open(&config.state_db)?,
            network_dir: config.network_dir.clone(),
            service_name: config.service_name.clone(),
            boot_wait_timeout: Duration::from_secs(config.boot_wait_timeout_seconds),
        })
    }

    /// Backing store for config values, for listing whole sections.
    pub fn db(&self) -> &ConfigDb {
        &self.db
    }

    fn systemctl(&self, args: &[&str]) -> Result<CommandOutput> {
        run_command("systemctl", args, None)
    }

    fn write_stanza(&self, adapter: &str, stanza: &str) -> Result<bool> {
        let path = paths::interface_stanza_path(&self.network_dir, adapter);
        if crate::io::read_optional(&path)?.as_deref() == Some(stanza) {
            tracing::debug!(adapter, path = %path.display(), "interface stanza unchanged");
            return Ok(false);
        }
        crate::io::atomic_write(&path, stanza.as_bytes())?;
        tracing::info!(adapter, path = %path.display(), "interface stanza written");
        Ok(true)
    }
}

impl OsUtils for LinuxOsUtils {
    fn wait_for_boot_completion(&self) -> Result<()> {
        // `is-system-running --wait` exits non-zero for "degraded", which still
        // means boot has finished. It never returns while our own unit is part
        // of the boot transaction, hence the deadline.
        let waited = run_with_timeout(
            "systemctl",
            &["is-system-running", "--wait"],
            self.boot_wait_timeout,
        );
        match waited {
            Ok(Some(out)) => {
                tracing::debug!(state = %out.stdout.trim(), "boot completed");
                Ok(())
            }
            Ok(None) => {
                tracing::warn!(
                    timeout_secs = self.boot_wait_timeout.as_secs(),
                    "boot did not complete in time, continuing"
                );
                Ok(())
            }
            Err(HostInitError::CommandNotFound(_)) => {
                tracing::debug!("systemctl not found, not waiting for boot completion");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn get_config_value(&self, key: &str, section: &str) -> Result<Option<String>> {
        self.db.get(section, key)
    }

    fn set_config_value(&self, key: &str, value: &str, section: &str) -> Result<()> {
        self.db.set(section, key, value)
    }

    fn remove_config_value(&self, key: &str, section: &str) -> Result<bool> {
        self.db.remove(section, key)
    }

    fn check_os_version(&self, major: u32, minor: u32) -> bool {
        let release = match std::fs::read_to_string(OS_RELEASE_FILE) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read kernel release");
                return false;
            }
        };
        match parse_version(&release) {
            Some(current) => current >= (major, minor),
            None => {
                tracing::warn!(release = %release.trim(), "unparseable kernel release");
                false
            }
        }
    }

    fn reboot(&self) -> Result<()> {
        tracing::info!("rebooting host");
        match self.systemctl(&["reboot"]) {
            Err(HostInitError::CommandNotFound(_)) => {
                run_command("shutdown", &["-r", "now"], None)?.check("shutdown -r now")
            }
            other => other?.check("systemctl reboot"),
        }
    }

    fn terminate(&self) -> Result<bool> {
        let Some(unit) = &self.service_name else {
            tracing::debug!("no service_name configured, process exits on return");
            return Ok(false);
        };
        tracing::info!(unit = %unit, "stopping hosting service");
        self.systemctl(&["stop", "--no-block", unit])?
            .check(&format!("systemctl stop {unit}"))?;
        Ok(true)
    }

    fn user_exists(&self, username: &str) -> Result<bool> {
        let passwd = std::fs::read_to_string(PASSWD_FILE)?;
        Ok(passwd_has_user(&passwd, username))
    }

    fn create_user(&self, username: &str, groups: &[String]) -> Result<()> {
        let joined = groups.join(",");
        let mut args = vec!["-m"];
        if !groups.is_empty() {
            args.push("-G");
            args.push(&joined);
        }
        args.push(username);
        run_command("useradd", &args, None)?.check("useradd")
    }

    fn set_user_password(&self, username: &str, password: &str) -> Result<()> {
        let line = format!("{username}:{password}\n");
        run_command("chpasswd", &[], Some(&line))?.check("chpasswd")
    }

    fn generate_random_password(&self, length: usize) -> String {
        generate_password(&mut rand::thread_rng(), length)
    }

    fn get_network_adapters(&self) -> Result<Vec<String>> {
        let mut adapters = Vec::new();
        for entry in std::fs::read_dir(SYS_CLASS_NET)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name != "lo" {
                adapters.push(name);
            }
        }
        adapters.sort();
        Ok(adapters)
    }

    fn set_static_network_config(
        &self,
        adapter: &str,
        config: &StaticNetworkConfig,
    ) -> Result<bool> {
        self.write_stanza(adapter, &render_static_stanza(adapter, config))
    }

    fn set_dhcp_network_config(&self, adapter: &str) -> Result<bool> {
        self.write_stanza(adapter, &render_dhcp_stanza(adapter))
    }

    fn service_exists(&self, name: &str) -> Result<bool> {
        Ok(self.systemctl(&["cat", &unit_name(name)])?.success)
    }

    fn get_service_start_mode(&self, name: &str) -> Result<ServiceStartMode> {
        let out = self.systemctl(&["is-enabled", &unit_name(name)])?;
        Ok(parse_start_mode(&out.stdout))
    }

    fn set_service_start_mode(&self, name: &str, mode: ServiceStartMode) -> Result<()> {
        let unit = unit_name(name);
        let verb = match mode {
            ServiceStartMode::Automatic => "enable",
            ServiceStartMode::Manual => "disable",
            ServiceStartMode::Disabled => "mask",
        };
        self.systemctl(&[verb, &unit])?
            .check(&format!("systemctl {verb} {unit}"))
    }

    fn get_service_status(&self, name: &str) -> Result<ServiceStatus> {
        let out = self.systemctl(&["is-active", &unit_name(name)])?;
        Ok(parse_service_status(&out.stdout))
    }

    fn start_service(&self, name: &str) -> Result<()> {
        let unit = unit_name(name);
        self.systemctl(&["start", &unit])?
            .check(&format!("systemctl start {unit}"))
    }

    fn firewall_create_rule(&self, name: &str, port: u16, protocol: Protocol) -> Result<()> {
        let port = port.to_string();
        run_command(
            "iptables",
            &[
                "-A",
                "INPUT",
                "-p",
                protocol.as_str(),
                "--dport",
                &port,
                "-m",
                "comment",
                "--comment",
                name,
                "-j",
                "ACCEPT",
            ],
            None,
        )?
        .check("iptables")
    }
}

// ---------------------------------------------------------------------------
// Command helpers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn check(self, what: &str) -> Result<()> {
        if self.success {
            return Ok(());
        }
        let hint = self.stderr.trim().chars().take(500).collect::<String>();
        Err(HostInitError::CommandFailed {
            command: what.to_string(),
            reason: hint,
        })
    }
}

/// Run `program` with `args`, optionally feeding `stdin`. A non-zero exit is
/// reported through `CommandOutput::success`, not as an error.
fn run_command(program: &str, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput> {
    let path = which::which(program)
        .map_err(|_| HostInitError::CommandNotFound(program.to_string()))?;
    run_resolved(&path, args, stdin)
}

fn run_resolved(path: &Path, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput> {
    let mut cmd = Command::new(path);
    cmd.args(args);
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let command = path.display().to_string();
    let mut child = cmd.spawn().map_err(|e| HostInitError::CommandFailed {
        command: command.clone(),
        reason: e.to_string(),
    })?;

    if let Some(input) = stdin {
        if let Some(pipe) = child.stdin.as_mut() {
            pipe.write_all(input.as_bytes())?;
        }
    }

    let output = child.wait_with_output()?;
    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like `run_command` without stdin, but kills the child and returns `None`
/// once `timeout` has elapsed.
fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<Option<CommandOutput>> {
    let path = which::which(program)
        .map_err(|_| HostInitError::CommandNotFound(program.to_string()))?;
    let command = path.display().to_string();
    let mut child = Command::new(&path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| HostInitError::CommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    let start = Instant::now();
    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if start.elapsed() >= timeout {
            tracing::debug!(command = %command, "killing command after timeout");
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let output = child.wait_with_output()?;
    Ok(Some(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }))
}

fn unit_name(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}.service")
    }
}

// ---------------------------------------------------------------------------
// Parsing / rendering
// ---------------------------------------------------------------------------

/// Leading `major.minor` of a kernel release string such as `6.8.0-45-generic`.
fn parse_version(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.trim().split(|c: char| !c.is_ascii_digit());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

fn passwd_has_user(passwd: &str, username: &str) -> bool {
    passwd
        .lines()
        .filter_map(|l| l.split(':').next())
        .any(|name| name == username)
}

fn parse_start_mode(is_enabled: &str) -> ServiceStartMode {
    match is_enabled.trim() {
        "enabled" | "enabled-runtime" | "static" | "alias" | "indirect" | "generated" => {
            ServiceStartMode::Automatic
        }
        "masked" | "masked-runtime" => ServiceStartMode::Disabled,
        _ => ServiceStartMode::Manual,
    }
}

fn parse_service_status(is_active: &str) -> ServiceStatus {
    match is_active.trim() {
        "active" | "reloading" | "activating" => ServiceStatus::Running,
        "inactive" | "failed" | "deactivating" => ServiceStatus::Stopped,
        _ => ServiceStatus::Unknown,
    }
}

fn render_static_stanza(adapter: &str, config: &StaticNetworkConfig) -> String {
    let mut out = format!("auto {adapter}\niface {adapter} inet static\n");
    let fields = [
        ("address", &config.address),
        ("netmask", &config.netmask),
        ("broadcast", &config.broadcast),
        ("gateway", &config.gateway),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            out.push_str(&format!("    {key} {v}\n"));
        }
    }
    if !config.dns_nameservers.is_empty() {
        out.push_str(&format!(
            "    dns-nameservers {}\n",
            config.dns_nameservers.join(" ")
        ));
    }
    out
}

fn render_dhcp_stanza(adapter: &str) -> String {
    format!("auto {adapter}\niface {adapter} inet dhcp\n")
}

/// Random password containing at least one lowercase letter, uppercase
/// letter, digit and symbol. Lengths below 4 are raised to 4.
fn generate_password<R: Rng>(rng: &mut R, length: usize) -> String {
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];
    let all: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < length.max(classes.len()) {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(rng);
    String::from_utf8_lossy(&chars).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
