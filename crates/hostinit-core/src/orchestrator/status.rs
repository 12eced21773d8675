//! Per-action outcome records, persisted through `OsUtils` config values.

use crate::error::Result;
use crate::osutils::OsUtils;

use super::action::Outcome;

/// Config section holding one entry per action identity.
pub const STATUS_SECTION: &str = "Plugins";

pub struct StatusStore<'a> {
    os: &'a dyn OsUtils,
}

impl<'a> StatusStore<'a> {
    pub fn new(os: &'a dyn OsUtils) -> Self {
        Self { os }
    }

    /// Last recorded outcome. Unrecognized stored text reads as absent, so
    /// the action is attempted again.
    pub fn get_status(&self, action: &str) -> Result<Option<Outcome>> {
        let Some(raw) = self.os.get_config_value(action, STATUS_SECTION)? else {
            return Ok(None);
        };
        match raw.parse::<Outcome>() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(_) => {
                tracing::warn!(action, value = %raw, "ignoring unrecognized status record");
                Ok(None)
            }
        }
    }

    pub fn set_status(&self, action: &str, outcome: Outcome) -> Result<()> {
        self.os
            .set_config_value(action, outcome.as_str(), STATUS_SECTION)
    }

    /// Forget the record for `action`. Returns true if one existed.
    pub fn clear_status(&self, action: &str) -> Result<bool> {
        self.os.remove_config_value(action, STATUS_SECTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOs;

    #[test]
    fn absent_until_set() {
        let os = FakeOs::new();
        let store = StatusStore::new(&os);
        assert_eq!(store.get_status("create_user").unwrap(), None);
        store.set_status("create_user", Outcome::Done).unwrap();
        assert_eq!(store.get_status("create_user").unwrap(), Some(Outcome::Done));
    }

    #[test]
    fn written_under_plugins_section() {
        let os = FakeOs::new();
        StatusStore::new(&os)
            .set_status("network_config", Outcome::ExecuteOnNextBoot)
            .unwrap();
        assert_eq!(
            os.config_value("network_config", STATUS_SECTION).as_deref(),
            Some("execute_on_next_boot")
        );
    }

    #[test]
    fn next_boot_is_not_done() {
        let os = FakeOs::new();
        let store = StatusStore::new(&os);
        store.set_status("a", Outcome::ExecuteOnNextBoot).unwrap();
        assert_eq!(
            store.get_status("a").unwrap(),
            Some(Outcome::ExecuteOnNextBoot)
        );
    }

    #[test]
    fn garbage_record_reads_as_absent() {
        let os = FakeOs::new();
        os.set_config_value("a", "1", STATUS_SECTION).unwrap();
        assert_eq!(StatusStore::new(&os).get_status("a").unwrap(), None);
    }

    #[test]
    fn clear_status() {
        let os = FakeOs::new();
        let store = StatusStore::new(&os);
        store.set_status("a", Outcome::Done).unwrap();
        assert!(store.clear_status("a").unwrap());
        assert!(!store.clear_status("a").unwrap());
        assert_eq!(store.get_status("a").unwrap(), None);
    }
}
