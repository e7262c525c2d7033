use super::{AccountKind, AuthError, AuthResult, CredentialStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Employee,
    Manager,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Employee => f.write_str("employee"),
            Role::Manager => f.write_str("manager"),
        }
    }
}

/// Logged-in identity and the permissions derived from its role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub username: String,
    pub role: Role,
    can_see_details: bool,
}

impl UserSession {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Managers always see the detailed rows
    pub fn can_see_details(&self) -> bool {
        self.is_manager() || self.can_see_details
    }

    pub fn require_manager(&self) -> AuthResult<()> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(format!(
                "'{}' is not a manager",
                self.username
            )))
        }
    }
}

/// Credential check against an injected store
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<dyn CredentialStore>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Role for a matching, enabled account
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        let entry = self.store.get(username)?;
        if entry.password != password {
            return None;
        }
        match entry.kind {
            AccountKind::Employee { active: true, .. } => Some(Role::Employee),
            AccountKind::Employee { active: false, .. } => None,
            AccountKind::Manager => Some(Role::Manager),
        }
    }

    /// Authenticate and open a session
    pub fn login(&self, username: &str, password: &str) -> AuthResult<UserSession> {
        let Some(role) = self.authenticate(username, password) else {
            warn!(username = %username, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let can_see_details = match self.store.get(username).map(|e| e.kind) {
            Some(AccountKind::Employee {
                can_see_details, ..
            }) => can_see_details,
            Some(AccountKind::Manager) => true,
            None => false,
        };

        info!(username = %username, role = %role, "User logged in");
        Ok(UserSession {
            username: username.to_string(),
            role,
            can_see_details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialEntry, InMemoryCredentialStore};

    fn gate() -> AuthGate {
        let store = InMemoryCredentialStore::new();
        store
            .upsert(CredentialEntry::employee("func1", "senha123", true, true))
            .unwrap();
        store
            .upsert(CredentialEntry::employee("ana", "vendas", false, true))
            .unwrap();
        store
            .upsert(CredentialEntry::employee("old", "pw", true, false))
            .unwrap();
        store.upsert(CredentialEntry::manager("boss", "chefe")).unwrap();
        AuthGate::new(Arc::new(store))
    }

    #[test]
    fn test_authenticate_roles() {
        let gate = gate();
        assert_eq!(gate.authenticate("func1", "senha123"), Some(Role::Employee));
        assert_eq!(gate.authenticate("boss", "chefe"), Some(Role::Manager));
    }

    #[test]
    fn test_authenticate_rejections() {
        let gate = gate();
        assert_eq!(gate.authenticate("func1", "wrong"), None);
        assert_eq!(gate.authenticate("old", "pw"), None);
        assert_eq!(gate.authenticate("nobody", "pw"), None);
        assert_eq!(gate.authenticate("boss", ""), None);
    }

    #[test]
    fn test_session_permissions() {
        let gate = gate();

        let ana = gate.login("ana", "vendas").unwrap();
        assert!(!ana.can_see_details());
        assert!(ana.require_manager().is_err());

        let func1 = gate.login("func1", "senha123").unwrap();
        assert!(func1.can_see_details());

        let boss = gate.login("boss", "chefe").unwrap();
        assert!(boss.can_see_details());
        assert!(boss.require_manager().is_ok());
    }

    #[test]
    fn test_login_failure() {
        assert_eq!(
            gate().login("old", "pw").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }
}
