// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Services talk to storage through the [`CredentialStore`] and
//! [`ChannelStore`] traits. [`FirestoreDb`] is the production backend and
//! [`MemoryStore`] keeps everything in process.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{User, Video};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const VIDEOS: &str = "videos";
    /// Subscriber → channel edges, keyed `{subscriber_id}_{channel_id}`
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Profile fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

/// Persistence for user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Get a user by ID.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Get a user by (lowercase) username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Get a user by (lowercase) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `AppError::Conflict` if the username or
    /// email is already taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Change only the profile fields present in `update` and bump
    /// `updated_at`. Credentials are never touched. Returns the stored user.
    ///
    /// Fails with `AppError::NotFound` for an unknown user and with
    /// `AppError::Conflict` if the new email belongs to someone else.
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate)
        -> Result<User, AppError>;

    /// Set or clear the stored refresh token. Succeeds even if the user does
    /// not exist.
    async fn set_refresh_token(&self, user_id: &str, token: Option<&str>)
        -> Result<(), AppError>;

    /// Replace the stored refresh token only if it still equals `expected`.
    ///
    /// Returns `false` when the stored value differs (or the user is gone)
    /// and nothing was written.
    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError>;

    /// Replace the stored password digest. No other field is written.
    async fn set_password(&self, user_id: &str, digest: &str) -> Result<(), AppError>;
}

/// Read access to the subscription graph and video catalogue.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Number of users subscribed to `channel_id`.
    async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError>;

    /// Number of channels `subscriber_id` is subscribed to.
    async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError>;

    async fn is_subscribed(&self, subscriber_id: &str, channel_id: &str)
        -> Result<bool, AppError>;

    /// Fetch videos by ID, in the order given. Unknown IDs are skipped.
    async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Video>, AppError>;
}
