// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used by tests and `STORE_BACKEND=memory` runs.

use super::{ChannelStore, CredentialStore, ProfileUpdate};
use crate::error::AppError;
use crate::models::{Subscription, User, Video};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    videos: HashMap<String, Video>,
    subscriptions: HashMap<String, Subscription>,
}

/// Memory-backed implementation of both store traits. Clones share data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a video.
    pub async fn insert_video(&self, video: Video) {
        self.inner
            .write()
            .await
            .videos
            .insert(video.id.clone(), video);
    }

    /// Record that `subscriber_id` follows `channel_id`.
    pub async fn subscribe(&self, subscriber_id: &str, channel_id: &str) {
        let subscription = Subscription {
            subscriber_id: subscriber_id.to_string(),
            channel_id: channel_id.to_string(),
            created_at: now_rfc3339(),
        };
        self.inner.write().await.subscriptions.insert(
            Subscription::document_id(subscriber_id, channel_id),
            subscription,
        );
    }

    /// Append a video to a user's watch history.
    pub async fn push_watch_history(&self, user_id: &str, video_id: &str) -> Result<(), AppError> {
        let mut data = self.inner.write().await;
        let user = data
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        user.watch_history.push(video_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut data = self.inner.write().await;

        // Checked under the write lock, so concurrent registrations cannot both pass
        let taken = data.users.contains_key(&user.id)
            || data
                .users
                .values()
                .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(AppError::Conflict(
                "user with email or username already exists".to_string(),
            ));
        }

        data.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, AppError> {
        let mut data = self.inner.write().await;

        if let Some(email) = &update.email {
            if data
                .users
                .values()
                .any(|u| u.id != user_id && &u.email == email)
            {
                return Err(AppError::Conflict("email is already in use".to_string()));
            }
        }

        let user = data
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        if let Some(full_name) = &update.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(avatar) = &update.avatar {
            user.avatar = avatar.clone();
        }
        if let Some(cover_image) = &update.cover_image {
            user.cover_image = Some(cover_image.clone());
        }
        user.updated_at = now_rfc3339();

        Ok(user.clone())
    }

    async fn set_refresh_token(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(user_id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let mut data = self.inner.write().await;
        match data.users.get_mut(user_id) {
            Some(user) if user.refresh_token.as_deref() == Some(expected) => {
                user.refresh_token = Some(replacement.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_password(&self, user_id: &str, digest: &str) -> Result<(), AppError> {
        let mut data = self.inner.write().await;
        let user = data
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        user.password = digest.to_string();
        user.updated_at = now_rfc3339();
        Ok(())
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.channel_id == channel_id)
            .count() as u64)
    }

    async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.subscriber_id == subscriber_id)
            .count() as u64)
    }

    async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .contains_key(&Subscription::document_id(subscriber_id, channel_id)))
    }

    async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Video>, AppError> {
        let data = self.inner.read().await;
        Ok(video_ids
            .iter()
            .filter_map(|id| data.videos.get(id).cloned())
            .collect())
    }
}
