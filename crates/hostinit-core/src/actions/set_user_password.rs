use crate::config::Config;
use crate::metadata::{MetadataService, LATEST};
use crate::orchestrator::context::{PASSWORD, USERNAME};
use crate::orchestrator::{Action, ActionError, ActionResult, SharedContext};
use crate::osutils::OsUtils;

use super::SET_USER_PASSWORD;

pub const GENERATED_PASSWORD_LENGTH: usize = 14;

/// Sets the admin password, preferring `admin_pass` from metadata.
pub struct SetUserPassword {
    default_username: String,
    inject_user_password: bool,
}

impl SetUserPassword {
    pub fn new(config: &Config) -> Self {
        Self {
            default_username: config.username.clone(),
            inject_user_password: config.inject_user_password,
        }
    }

    fn choose_password(
        &self,
        service: &dyn MetadataService,
        os: &dyn OsUtils,
    ) -> Result<String, ActionError> {
        if self.inject_user_password {
            if let Some(pass) = service.get_meta_data(LATEST)?.admin_pass {
                if !pass.is_empty() {
                    return Ok(pass);
                }
            }
            tracing::debug!("no admin_pass in metadata, generating a password");
        }
        Ok(os.generate_random_password(GENERATED_PASSWORD_LENGTH))
    }
}

impl Action for SetUserPassword {
    fn identity(&self) -> &str {
        SET_USER_PASSWORD
    }

    fn run(
        &self,
        service: &dyn MetadataService,
        os: &dyn OsUtils,
        ctx: &mut SharedContext,
    ) -> Result<ActionResult, ActionError> {
        let username = ctx
            .get(USERNAME)
            .unwrap_or(self.default_username.as_str())
            .to_string();

        if !os.user_exists(&username)? {
            tracing::warn!(user = %username, "user does not exist, retrying next boot");
            return Ok(ActionResult::next_boot());
        }

        let password = self.choose_password(service, os)?;
        os.set_user_password(&username, &password)?;
        tracing::info!(user = %username, "password set");
        ctx.publish(PASSWORD, password)?;
        Ok(ActionResult::done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetaData;
    use crate::orchestrator::Outcome;
    use crate::testing::{FakeMetadata, FakeOs};

    fn action(inject: bool) -> SetUserPassword {
        SetUserPassword::new(&Config {
            username: "Admin".into(),
            inject_user_password: inject,
            ..Config::default()
        })
    }

    fn metadata_with_pass(pass: &str) -> FakeMetadata {
        FakeMetadata::with_meta(MetaData {
            admin_pass: Some(pass.to_string()),
            ..MetaData::default()
        })
    }

    #[test]
    fn uses_admin_pass_for_context_user() {
        let os = FakeOs::new();
        os.add_user("ops");
        let mut ctx = SharedContext::new();
        ctx.publish(USERNAME, "ops").unwrap();

        let result = action(true)
            .run(&metadata_with_pass("s3cret"), &os, &mut ctx)
            .unwrap();

        assert_eq!(result, ActionResult::done());
        assert_eq!(os.password_of("ops").as_deref(), Some("s3cret"));
        assert_eq!(ctx.get(PASSWORD), Some("s3cret"));
    }

    #[test]
    fn generates_password_when_injection_disabled() {
        let os = FakeOs::new();
        os.add_user("Admin");
        let mut ctx = SharedContext::new();

        action(false)
            .run(&metadata_with_pass("ignored"), &os, &mut ctx)
            .unwrap();

        let pass = os.password_of("Admin").unwrap();
        assert_eq!(pass.len(), GENERATED_PASSWORD_LENGTH);
        assert_ne!(pass, "ignored");
        assert_eq!(ctx.get(PASSWORD), Some(pass.as_str()));
    }

    #[test]
    fn generates_password_when_metadata_has_none() {
        let os = FakeOs::new();
        os.add_user("Admin");
        let mut ctx = SharedContext::new();

        action(true).run(&FakeMetadata::new(), &os, &mut ctx).unwrap();
        assert_eq!(
            os.password_of("Admin").map(|p| p.len()),
            Some(GENERATED_PASSWORD_LENGTH)
        );
    }

    #[test]
    fn missing_user_defers_to_next_boot() {
        let os = FakeOs::new();
        let mut ctx = SharedContext::new();

        let result = action(true)
            .run(&metadata_with_pass("s3cret"), &os, &mut ctx)
            .unwrap();

        assert_eq!(result.outcome, Outcome::ExecuteOnNextBoot);
        assert!(!result.reboot_required);
        assert!(ctx.get(PASSWORD).is_none());
    }
}
