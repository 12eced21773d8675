use crate::config::Config;
use crate::metadata::MetadataService;
use crate::orchestrator::context::USERNAME;
use crate::orchestrator::{Action, ActionError, ActionResult, SharedContext};
use crate::osutils::OsUtils;

use super::CREATE_USER;

/// Ensures the configured admin account exists and publishes its name.
pub struct CreateUser {
    username: String,
    groups: Vec<String>,
}

impl CreateUser {
    pub fn new(config: &Config) -> Self {
        Self {
            username: config.username.clone(),
            groups: config.groups.clone(),
        }
    }
}

impl Action for CreateUser {
    fn identity(&self) -> &str {
        CREATE_USER
    }

    fn run(
        &self,
        _service: &dyn MetadataService,
        os: &dyn OsUtils,
        ctx: &mut SharedContext,
    ) -> Result<ActionResult, ActionError> {
        if os.user_exists(&self.username)? {
            tracing::info!(user = %self.username, "user already exists");
        } else {
            tracing::info!(user = %self.username, groups = ?self.groups, "creating user");
            os.create_user(&self.username, &self.groups)?;
        }
        ctx.publish(USERNAME, self.username.clone())?;
        Ok(ActionResult::done())
    }
}
