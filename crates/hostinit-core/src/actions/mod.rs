//! Built-in provisioning actions.
//!
//! Each action is addressed by a stable name that doubles as its status key.
//! `build` turns a configured name into a boxed `Action`.

pub mod create_user;
pub mod network_config;
pub mod remote_listener;
pub mod set_user_password;

pub use create_user::CreateUser;
pub use network_config::NetworkConfig;
pub use remote_listener::RemoteListener;
pub use set_user_password::SetUserPassword;

use crate::config::Config;
use crate::error::{HostInitError, Result};
use crate::orchestrator::Action;

pub const CREATE_USER: &str = "create_user";
pub const SET_USER_PASSWORD: &str = "set_user_password";
pub const NETWORK_CONFIG: &str = "network_config";
pub const REMOTE_LISTENER: &str = "remote_listener";

/// Every built-in action, in default run order.
pub const ALL: &[&str] = &[CREATE_USER, SET_USER_PASSWORD, NETWORK_CONFIG, REMOTE_LISTENER];

pub fn is_known(name: &str) -> bool {
    ALL.contains(&name)
}

pub fn build(name: &str, config: &Config) -> Result<Box<dyn Action>> {
    let action: Box<dyn Action> = match name {
        CREATE_USER => Box::new(CreateUser::new(config)),
        SET_USER_PASSWORD => Box::new(SetUserPassword::new(config)),
        NETWORK_CONFIG => Box::new(NetworkConfig::new(config)),
        REMOTE_LISTENER => Box::new(RemoteListener::new(config)),
        other => return Err(HostInitError::UnknownAction(other.to_string())),
    };
    Ok(action)
}
