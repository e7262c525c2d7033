//! Account storage.

use super::{AuthError, AuthResult};
use crate::config::CredentialsConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role-specific account data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Employee { can_see_details: bool, active: bool },
    /// Managers are always enabled and see everything
    Manager,
}

/// One account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub username: String,
    pub password: String,
    pub kind: AccountKind,
}

impl CredentialEntry {
    pub fn employee(
        username: impl Into<String>,
        password: impl Into<String>,
        can_see_details: bool,
        active: bool,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            kind: AccountKind::Employee {
                can_see_details,
                active,
            },
        }
    }

    pub fn manager(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            kind: AccountKind::Manager,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self.kind, AccountKind::Manager)
    }

    fn same_role(&self, other: &CredentialEntry) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(&other.kind)
    }
}

/// Account storage used by the gate and the manager panel.
///
/// Usernames are unique across roles: `upsert` may update an account in place
/// but must refuse to turn an employee name into a manager (or back).
pub trait CredentialStore: Send + Sync {
    fn get(&self, username: &str) -> Option<CredentialEntry>;
    fn upsert(&self, entry: CredentialEntry) -> AuthResult<()>;
    /// All accounts ordered by username
    fn list(&self) -> Vec<CredentialEntry>;
}

/// Process-lifetime store; changes are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<BTreeMap<String, CredentialEntry>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the configured employee and manager tables.
    /// A username appearing twice (in either table) is a configuration error.
    pub fn from_config(config: &CredentialsConfig) -> AuthResult<Self> {
        let store = Self::new();
        let entries = config
            .employees
            .iter()
            .map(|e| CredentialEntry::employee(&e.username, &e.password, e.can_see_details, e.active))
            .chain(
                config
                    .managers
                    .iter()
                    .map(|m| CredentialEntry::manager(&m.username, &m.password)),
            );

        {
            let mut accounts = store.accounts.write();
            for entry in entries {
                if accounts.contains_key(&entry.username) {
                    return Err(AuthError::DuplicateConfiguredUser(entry.username));
                }
                accounts.insert(entry.username.clone(), entry);
            }
        }

        tracing::debug!(accounts = store.accounts.read().len(), "Credential store initialized");
        Ok(store)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, username: &str) -> Option<CredentialEntry> {
        self.accounts.read().get(username).cloned()
    }

    fn upsert(&self, entry: CredentialEntry) -> AuthResult<()> {
        if entry.username.trim().is_empty() || entry.password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }

        let mut accounts = self.accounts.write();
        if let Some(existing) = accounts.get(&entry.username) {
            if !existing.same_role(&entry) {
                return Err(AuthError::UsernameTaken(entry.username));
            }
        }
        accounts.insert(entry.username.clone(), entry);
        Ok(())
    }

    fn list(&self) -> Vec<CredentialEntry> {
        self.accounts.read().values().cloned().collect()
    }
}
