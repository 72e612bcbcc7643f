// SPDX-License-Identifier: MPL-2.0

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use thiserror::Error;

/// Messages are shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication failed, Password should be at least 6 characters")]
    WeakPassword,
    #[error("Authentication failed, Invalid email entered")]
    InvalidEmail,
    #[error("Authentication failed, Email already registered.")]
    EmailInUse,
    #[error("There is no user with this email address.")]
    UnknownUser,
    #[error("Incorrect password. Please try again.")]
    WrongPassword,
}

/// The signed-in account as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Managed email/password authentication.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account and sign it in.
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn current_user(&self) -> Option<AuthUser>;
}

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Check sign-up input the way the hosted service does.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if !is_valid_email(email) {
        return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

struct Account {
    uid: String,
    password: String,
}

#[derive(Default)]
struct MemoryAccounts {
    by_email: HashMap<String, Account>,
    current: Option<AuthUser>,
}

/// In-process auth service with the hosted service's validation rules.
#[derive(Clone, Default)]
pub struct MemoryAuth {
    inner: Arc<Mutex<MemoryAccounts>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryAccounts> {
        self.inner.lock().expect("auth lock poisoned")
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);
        validate_credentials(&email, password)?;

        let mut inner = self.lock();
        if inner.by_email.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let uid = uuid::Uuid::now_v7().simple().to_string();
        inner.by_email.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );

        let user = AuthUser { uid, email };
        inner.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);
        let mut inner = self.lock();
        let account = inner.by_email.get(&email).ok_or(AuthError::UnknownUser)?;
        if account.password != password {
            return Err(AuthError::WrongPassword);
        }

        let user = AuthUser {
            uid: account.uid.clone(),
            email,
        };
        inner.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().current = None;
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.lock().current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("hero@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("hero@"));
        assert!(!is_valid_email("hero.example.com"));
        assert!(!is_valid_email("hero@example"));
    }

    #[test]
    fn short_password_is_weak() {
        assert_eq!(
            validate_credentials("hero@example.com", "12345"),
            Err(AuthError::WeakPassword)
        );
        assert!(validate_credentials("hero@example.com", "123456").is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = MemoryAuth::new();
        auth.create_user("hero@example.com", "secret1").await.unwrap();
        assert_eq!(
            auth.create_user("HERO@example.com", "secret2").await,
            Err(AuthError::EmailInUse)
        );
    }

    #[tokio::test]
    async fn sign_in_errors_match_messages() {
        let auth = MemoryAuth::new();
        auth.create_user("hero@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current_user().is_none());

        let err = auth.sign_in("nobody@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.to_string(), "There is no user with this email address.");

        let err = auth.sign_in("hero@example.com", "wrong!").await.unwrap_err();
        assert_eq!(err.to_string(), "Incorrect password. Please try again.");

        let user = auth.sign_in("hero@example.com", "secret1").await.unwrap();
        assert_eq!(auth.current_user(), Some(user));
    }
}
