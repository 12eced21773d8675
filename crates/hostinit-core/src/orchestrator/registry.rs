//! Ordered action list, assembled once at startup.

use std::collections::HashSet;

use crate::actions;
use crate::config::Config;
use crate::error::{HostInitError, Result};
use crate::paths;

use super::action::Action;

#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Box<dyn Action>>,
    ids: HashSet<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for `config.actions`, in order.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for name in &config.actions {
            registry.register(actions::build(name, config)?)?;
        }
        Ok(registry)
    }

    /// Append `action`. Identity and requirement shape are checked here so
    /// the orchestrator never has to reject an action mid-run.
    pub fn register(&mut self, action: Box<dyn Action>) -> Result<()> {
        let id = action.identity().to_string();
        paths::validate_action_id(&id)?;

        let req = action.requirements();
        if let Some(platform) = &req.platform {
            if platform.trim().is_empty() {
                return Err(HostInitError::InvalidRequirements {
                    action: id,
                    reason: "platform must not be empty".to_string(),
                });
            }
        }

        if !self.ids.insert(id.clone()) {
            return Err(HostInitError::DuplicateAction(id));
        }
        self.actions.push(action);
        Ok(())
    }

    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    pub fn identities(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.identity()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
