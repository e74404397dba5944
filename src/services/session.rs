// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, logout, refresh-token rotation and password change.
//!
//! A user moves between anonymous, authenticated (refresh token stored) and
//! logged out (refresh token cleared). Each refresh replaces the stored
//! token, so a refresh token is accepted at most once.

use crate::db::CredentialStore;
use crate::error::{AppError, AuthFailure, Result};
use crate::models::{User, UserProfile};
use crate::services::password::{hash_password_async, verify_password_async};
use crate::services::tokens::{TokenKind, TokenService};
use crate::time_utils::now_rfc3339;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-user locks that serialize refresh-token rotation.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Input for account creation. Media fields are URLs already uploaded by the
/// client.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub username: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Login identifier plus password. At least one identifier is required.
#[derive(Debug, Clone, Default)]
pub struct LoginCredentials {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Trimmed value, or `None` if blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Session state transitions over a credential store.
#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn CredentialStore>,
    tokens: TokenService,
    refresh_locks: RefreshLocks,
}

impl SessionService {
    pub fn new(users: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self {
            users,
            tokens,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create a user. Does not log them in.
    pub async fn register(&self, registration: Registration) -> Result<UserProfile> {
        let full_name = registration.full_name.trim();
        let email = registration.email.trim().to_lowercase();
        let username = registration.username.trim().to_lowercase();

        if [full_name, email.as_str(), registration.password.trim(), username.as_str()]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(AppError::Validation(
                "All fields are compulsory and required".to_string(),
            ));
        }

        let avatar = non_blank(Some(registration.avatar.as_str()))
            .ok_or_else(|| AppError::Validation("avatar file is required".to_string()))?
            .to_string();

        if self.users.find_user_by_username(&username).await?.is_some()
            || self.users.find_user_by_email(&email).await?.is_some()
        {
            return Err(AppError::Conflict(
                "user with email or username already exists".to_string(),
            ));
        }

        let digest = hash_password_async(registration.password).await?;
        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            full_name: full_name.to_string(),
            avatar,
            cover_image: non_blank(registration.cover_image.as_deref()).map(str::to_string),
            password: digest,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.users.create_user(&user).await?;

        let created = self.users.get_user(&user.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "something went wrong while registering the user"
            ))
        })?;

        tracing::info!(user_id = %created.id, username = %created.username, "User registered");

        Ok(UserProfile::from(&created))
    }

    /// Verify credentials, issue a token pair and store the refresh token.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<LoginOutcome> {
        let username = non_blank(credentials.username.as_deref()).map(str::to_lowercase);
        let email = non_blank(credentials.email.as_deref()).map(str::to_lowercase);

        if username.is_none() && email.is_none() {
            return Err(AppError::Validation(
                "username or email is required".to_string(),
            ));
        }

        let mut found = None;
        if let Some(username) = &username {
            found = self.users.find_user_by_username(username).await?;
        }
        if found.is_none() {
            if let Some(email) = &email {
                found = self.users.find_user_by_email(email).await?;
            }
        }

        let Some(user) = found else {
            tracing::warn!(
                username = ?username,
                email = ?email,
                "Login failed: unknown identifier"
            );
            return Err(AppError::Unauthorized(AuthFailure::UserNotFound));
        };

        if !verify_password_async(credentials.password, user.password.clone()).await? {
            tracing::warn!(user_id = %user.id, "Login failed: incorrect password");
            return Err(AppError::Unauthorized(AuthFailure::IncorrectPassword));
        }

        let tokens = self.issue_pair(&user.id)?;
        self.users
            .set_refresh_token(&user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    /// Clear the stored refresh token. Safe to repeat.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.users.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Exchange the current refresh token for a new pair.
    ///
    /// The presented token must verify and equal the stored one; the stored
    /// value is then swapped for the new refresh token.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair> {
        let presented = non_blank(presented)
            .ok_or(AppError::Unauthorized(AuthFailure::MissingToken))?;

        let claims = self
            .tokens
            .verify(presented, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token failed verification");
                AppError::from(e)
            })?;
        let user_id = claims.sub;

        let lock = self
            .refresh_locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        let result = self.rotate(&user_id, presented).await;

        drop(guard);
        drop(lock);
        // Forget the lock once no other refresh for this user holds or awaits it
        self.refresh_locks
            .remove_if(&user_id, |_, held| Arc::strong_count(held) == 1);

        result
    }

    /// Check the presented token against the stored one and swap in a new
    /// pair. Callers hold the user's refresh lock.
    async fn rotate(&self, user_id: &str, presented: &str) -> Result<TokenPair> {
        let user = self.users.get_user(user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id, "Refresh token for unknown user");
            AppError::Unauthorized(AuthFailure::InvalidToken)
        })?;

        if user.refresh_token.as_deref() != Some(presented) {
            tracing::warn!(user_id, "Refresh token expired or already used");
            return Err(AppError::Unauthorized(AuthFailure::RefreshTokenMismatch));
        }

        let tokens = self.issue_pair(user_id)?;
        let rotated = self
            .users
            .rotate_refresh_token(user_id, presented, &tokens.refresh_token)
            .await?;
        if !rotated {
            tracing::warn!(user_id, "Refresh token replaced concurrently");
            return Err(AppError::Unauthorized(AuthFailure::RefreshTokenMismatch));
        }

        tracing::info!(user_id, "Refresh token rotated");

        Ok(tokens)
    }

    /// Replace the password after checking the old one. Tokens are untouched.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if old_password.is_empty() || new_password.trim().is_empty() {
            return Err(AppError::Validation(
                "old and new password are required".to_string(),
            ));
        }

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        if !verify_password_async(old_password.to_string(), user.password).await? {
            tracing::warn!(user_id, "Password change rejected: wrong old password");
            return Err(AppError::Validation("invalid old password".to_string()));
        }

        let digest = hash_password_async(new_password.to_string()).await?;
        self.users.set_password(user_id, &digest).await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    fn issue_pair(&self, user_id: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access_token(user_id)?,
            refresh_token: self.tokens.issue_refresh_token(user_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryStore;
    use crate::services::password::verify_password;

    fn service() -> (SessionService, MemoryStore) {
        let store = MemoryStore::new();
        let tokens = TokenService::from_config(&Config::test_default());
        (SessionService::new(Arc::new(store.clone()), tokens), store)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            full_name: "Test User".to_string(),
            email: email.to_string(),
            password: "hunter2!".to_string(),
            username: username.to_string(),
            avatar: "https://cdn.example.com/avatar.png".to_string(),
            cover_image: None,
        }
    }

    fn login_as(username: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            username: Some(username.to_string()),
            email: None,
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_blank_fields_rejected_before_store() {
        let (sessions, store) = service();

        for blank in ["", "   "] {
            let mut cases = Vec::new();
            let mut r = registration("alice", "alice@example.com");
            r.full_name = blank.to_string();
            cases.push(r);
            let mut r = registration("alice", "alice@example.com");
            r.email = blank.to_string();
            cases.push(r);
            let mut r = registration("alice", "alice@example.com");
            r.password = blank.to_string();
            cases.push(r);
            let mut r = registration("alice", "alice@example.com");
            r.username = blank.to_string();
            cases.push(r);

            for case in cases {
                let err = sessions.register(case).await.unwrap_err();
                assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);
            }
        }

        assert!(store.find_user_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_requires_avatar() {
        let (sessions, _) = service();
        let mut r = registration("alice", "alice@example.com");
        r.avatar = " ".to_string();

        let err = sessions.register(r).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_stores_digest_and_normalizes() {
        let (sessions, store) = service();
        let profile = sessions
            .register(registration("  Alice ", "Alice@Example.com"))
            .await
            .unwrap();

        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@example.com");
        assert!(profile.watch_history.is_empty());

        let stored = store.get_user(&profile.id).await.unwrap().unwrap();
        assert_ne!(stored.password, "hunter2!");
        assert!(verify_password("hunter2!", &stored.password).unwrap());
        assert!(!verify_password("hunter3!", &stored.password).unwrap());
        assert_eq!(stored.refresh_token, None);
    }

    #[tokio::test]
    async fn test_register_duplicate_username_any_case() {
        let (sessions, _) = service();
        sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = sessions
            .register(registration("ALICE", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = sessions
            .register(registration("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_distinguishable() {
        let (sessions, store) = service();
        let profile = sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = sessions
            .login(login_as("nobody", "hunter2!"))
            .await
            .unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::UserNotFound));

        let err = sessions
            .login(login_as("alice", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::IncorrectPassword));

        // No token was stored by the failed attempts
        let stored = store.get_user(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, None);
    }

    #[tokio::test]
    async fn test_login_requires_identifier() {
        let (sessions, _) = service();
        let err = sessions
            .login(LoginCredentials {
                username: Some("  ".to_string()),
                email: None,
                password: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_by_email_stores_refresh_token() {
        let (sessions, store) = service();
        let profile = sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let outcome = sessions
            .login(LoginCredentials {
                username: None,
                email: Some("ALICE@example.com".to_string()),
                password: "hunter2!".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.user.id, profile.id);
        let stored = store.get_user(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(outcome.tokens.refresh_token.clone()));

        let claims = sessions
            .tokens()
            .verify(&outcome.tokens.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.sub, profile.id);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let (sessions, _) = service();
        sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let r1 = sessions
            .login(login_as("alice", "hunter2!"))
            .await
            .unwrap()
            .tokens
            .refresh_token;

        let pair = sessions.refresh(Some(&r1)).await.unwrap();
        assert_ne!(pair.refresh_token, r1);

        let err = sessions.refresh(Some(&r1)).await.unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::RefreshTokenMismatch));

        // The rotated token still works
        sessions.refresh(Some(&pair.refresh_token)).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_locks_released_after_use() {
        let (sessions, _) = service();
        sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let r1 = sessions
            .login(login_as("alice", "hunter2!"))
            .await
            .unwrap()
            .tokens
            .refresh_token;

        sessions.refresh(Some(&r1)).await.unwrap();
        assert!(sessions.refresh_locks.is_empty());

        // Failed rotations release the lock too
        sessions.refresh(Some(&r1)).await.unwrap_err();
        assert!(sessions.refresh_locks.is_empty());

        let (a, b) = tokio::join!(
            sessions.refresh(Some(&r1)),
            sessions.refresh(Some(&r1)),
        );
        assert!(a.is_err() && b.is_err());
        assert!(sessions.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_after_logout_fails() {
        let (sessions, _) = service();
        let profile = sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let r1 = sessions
            .login(login_as("alice", "hunter2!"))
            .await
            .unwrap()
            .tokens
            .refresh_token;

        sessions.logout(&profile.id).await.unwrap();
        sessions.logout(&profile.id).await.unwrap();

        let err = sessions.refresh(Some(&r1)).await.unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::RefreshTokenMismatch));
    }

    #[tokio::test]
    async fn test_refresh_rejects_missing_and_access_tokens() {
        let (sessions, _) = service();
        sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let outcome = sessions.login(login_as("alice", "hunter2!")).await.unwrap();

        let err = sessions.refresh(None).await.unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::MissingToken));

        let err = sessions
            .refresh(Some(&outcome.tokens.access_token))
            .await
            .unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::InvalidToken));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (sessions, store) = service();
        let profile = sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let before = store.get_user(&profile.id).await.unwrap().unwrap().password;

        let err = sessions
            .change_password(&profile.id, "not-it", "new-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let unchanged = store.get_user(&profile.id).await.unwrap().unwrap().password;
        assert_eq!(before, unchanged);

        sessions
            .change_password(&profile.id, "hunter2!", "new-pass")
            .await
            .unwrap();

        sessions.login(login_as("alice", "new-pass")).await.unwrap();
        let err = sessions
            .login(login_as("alice", "hunter2!"))
            .await
            .unwrap_err();
        assert_eq!(err.auth_failure(), Some(AuthFailure::IncorrectPassword));
    }

    #[tokio::test]
    async fn test_change_password_keeps_refresh_token() {
        let (sessions, _) = service();
        let profile = sessions
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let r1 = sessions
            .login(login_as("alice", "hunter2!"))
            .await
            .unwrap()
            .tokens
            .refresh_token;

        sessions
            .change_password(&profile.id, "hunter2!", "new-pass")
            .await
            .unwrap();

        sessions.refresh(Some(&r1)).await.unwrap();
    }
}
