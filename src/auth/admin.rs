//! Manager panel operations on accounts.

use super::{AccountKind, AuthError, AuthResult, CredentialEntry, CredentialStore, UserSession};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// 承認待ちの登録申請
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub username: String,
    password: String,
}

pub struct AccountAdmin {
    store: Arc<dyn CredentialStore>,
    pending: Mutex<BTreeMap<String, PendingRegistration>>,
}

impl AccountAdmin {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Self-service employee sign-up; the account only exists after a manager approves it.
    pub fn request_registration(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> AuthResult<()> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let mut pending = self.pending.lock();
        if self.store.get(username).is_some() || pending.contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }
        pending.insert(
            username.to_string(),
            PendingRegistration {
                username: username.to_string(),
                password: password.to_string(),
            },
        );

        info!(username = %username, "Registration requested");
        Ok(())
    }

    /// Pending usernames in order
    pub fn pending(&self) -> Vec<String> {
        self.pending.lock().keys().cloned().collect()
    }

    /// Turn a pending request into an active employee without detail access
    pub fn approve(&self, session: &UserSession, username: &str) -> AuthResult<()> {
        session.require_manager()?;

        let mut pending = self.pending.lock();
        let request = pending
            .get(username)
            .cloned()
            .ok_or_else(|| AuthError::NoPendingRegistration(username.to_string()))?;

        self.store.upsert(CredentialEntry::employee(
            request.username,
            request.password,
            false,
            true,
        ))?;
        pending.remove(username);

        info!(username = %username, approved_by = %session.username, "Registration approved");
        Ok(())
    }

    pub fn reject(&self, session: &UserSession, username: &str) -> AuthResult<()> {
        session.require_manager()?;

        if self.pending.lock().remove(username).is_none() {
            return Err(AuthError::NoPendingRegistration(username.to_string()));
        }

        info!(username = %username, rejected_by = %session.username, "Registration rejected");
        Ok(())
    }

    /// Create an employee account directly
    pub fn create_employee(
        &self,
        session: &UserSession,
        username: &str,
        password: &str,
        can_see_details: bool,
        active: bool,
    ) -> AuthResult<()> {
        session.require_manager()?;

        if self.store.get(username).is_some() || self.pending.lock().contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }
        self.store.upsert(CredentialEntry::employee(
            username,
            password,
            can_see_details,
            active,
        ))?;

        info!(username = %username, created_by = %session.username, "Employee account created");
        Ok(())
    }

    pub fn set_active(&self, session: &UserSession, username: &str, active: bool) -> AuthResult<()> {
        self.update_employee(session, username, |flags| flags.1 = active)?;
        info!(username = %username, active, "Employee active flag changed");
        Ok(())
    }

    pub fn set_can_see_details(
        &self,
        session: &UserSession,
        username: &str,
        can_see_details: bool,
    ) -> AuthResult<()> {
        self.update_employee(session, username, |flags| flags.0 = can_see_details)?;
        info!(username = %username, can_see_details, "Employee detail permission changed");
        Ok(())
    }

    /// Employee accounts, for the management list
    pub fn employees(&self) -> Vec<CredentialEntry> {
        self.store
            .list()
            .into_iter()
            .filter(|entry| !entry.is_manager())
            .collect()
    }

    /// Apply a change to an employee's `(can_see_details, active)` flags
    fn update_employee(
        &self,
        session: &UserSession,
        username: &str,
        change: impl FnOnce(&mut (bool, bool)),
    ) -> AuthResult<()> {
        session.require_manager()?;

        let mut entry = self
            .store
            .get(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;
        let AccountKind::Employee {
            can_see_details,
            active,
        } = entry.kind
        else {
            return Err(AuthError::NotAnEmployee(username.to_string()));
        };

        let mut flags = (can_see_details, active);
        change(&mut flags);
        entry.kind = AccountKind::Employee {
            can_see_details: flags.0,
            active: flags.1,
        };
        self.store.upsert(entry)
    }
}
