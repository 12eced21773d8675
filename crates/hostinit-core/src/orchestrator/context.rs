//! In-run values handed from one action to the next.
//!
//! Keys are declared here so producers and consumers agree at compile time.
//! The context is append-only: a key is published once per run and never
//! overwritten. Nothing in it is persisted.

use std::collections::BTreeMap;

use crate::error::{HostInitError, Result};

/// A well-known context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextKey(&'static str);

impl ContextKey {
    pub const fn name(self) -> &'static str {
        self.0
    }
}

/// Account chosen by the user-creation step.
pub const USERNAME: ContextKey = ContextKey("username");
/// Password set for that account.
pub const PASSWORD: ContextKey = ContextKey("password");

#[derive(Debug, Default)]
pub struct SharedContext {
    values: BTreeMap<ContextKey, String>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, key: ContextKey, value: impl Into<String>) -> Result<()> {
        if self.values.contains_key(&key) {
            return Err(HostInitError::ContextKeyExists(key.name()));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: ContextKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Published key names in key order, for diagnostics.
    pub fn keys(&self) -> Vec<&'static str> {
        self.values.keys().map(|k| k.name()).collect()
    }
}
