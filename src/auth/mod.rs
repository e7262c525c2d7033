//! 認証モジュール
//!
//! Username/password gate with two roles.
//!
//! ## 機能
//!
//! - `CredentialStore`: pluggable account storage (`get` / `upsert` / `list`)
//! - `AuthGate`: credential check → `UserSession`
//! - `AccountAdmin`: manager panel operations (registration approval, flags)

mod admin;
mod credentials;
mod gate;

pub use admin::{AccountAdmin, PendingRegistration};
pub use credentials::{AccountKind, CredentialEntry, CredentialStore, InMemoryCredentialStore};
pub use gate::{AuthGate, Role, UserSession};

/// 認証関連のエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Username already used by another account or a pending request
    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    /// 設定内でユーザー名が重複
    #[error("Username configured more than once: {0}")]
    DuplicateConfiguredUser(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Username and password are required")]
    EmptyCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Invalid username or password, or inactive account")]
    InvalidCredentials,

    #[error("No pending registration for: {0}")]
    NoPendingRegistration(String),

    #[error("Account is not an employee account: {0}")]
    NotAnEmployee(String),

    /// 権限不足
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
