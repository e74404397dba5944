// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile reads and updates for an authenticated user, plus the public
//! channel page.

use crate::db::{ChannelStore, CredentialStore, ProfileUpdate};
use crate::error::{AppError, Result};
use crate::models::{ChannelProfile, OwnerProfile, User, UserProfile, WatchedVideo};
use std::collections::HashMap;
use std::sync::Arc;

/// Account and channel operations.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn CredentialStore>,
    channels: Arc<dyn ChannelStore>,
}

fn required(value: &str, message: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

impl AccountService {
    pub fn new(users: Arc<dyn CredentialStore>, channels: Arc<dyn ChannelStore>) -> Self {
        Self { users, channels }
    }

    async fn load_user(&self, user_id: &str) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Profile of the authenticated user.
    pub async fn current_user(&self, user_id: &str) -> Result<UserProfile> {
        let user = self.load_user(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    /// Change display name and email. Email stays unique across users.
    pub async fn update_account_details(
        &self,
        user_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<UserProfile> {
        let full_name = required(full_name, "fullName and email are required")?;
        let email = required(email, "fullName and email are required")?.to_lowercase();

        let update = ProfileUpdate {
            full_name: Some(full_name),
            email: Some(email),
            ..Default::default()
        };
        let user = self.users.update_profile(user_id, &update).await?;

        tracing::info!(user_id, "Account details updated");
        Ok(UserProfile::from(&user))
    }

    /// Point the avatar at a newly uploaded image.
    pub async fn update_avatar(&self, user_id: &str, avatar: &str) -> Result<UserProfile> {
        let update = ProfileUpdate {
            avatar: Some(required(avatar, "avatar file is missing")?),
            ..Default::default()
        };
        let user = self.users.update_profile(user_id, &update).await?;

        tracing::info!(user_id, "Avatar updated");
        Ok(UserProfile::from(&user))
    }

    /// Point the cover image at a newly uploaded image.
    pub async fn update_cover_image(
        &self,
        user_id: &str,
        cover_image: &str,
    ) -> Result<UserProfile> {
        let update = ProfileUpdate {
            cover_image: Some(required(cover_image, "cover image file is missing")?),
            ..Default::default()
        };
        let user = self.users.update_profile(user_id, &update).await?;

        tracing::info!(user_id, "Cover image updated");
        Ok(UserProfile::from(&user))
    }

    /// Public channel page. `viewer_id` is the caller, if signed in.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> Result<ChannelProfile> {
        let username = required(username, "username is missing")?.to_lowercase();

        let channel = self
            .users
            .find_user_by_username(&username)
            .await?
            .ok_or_else(|| AppError::NotFound("channel does not exist".to_string()))?;

        let subscribers_count = self.channels.count_subscribers(&channel.id).await?;
        let channels_subscribed_to_count =
            self.channels.count_subscriptions(&channel.id).await?;
        let is_subscribed = match viewer_id {
            Some(viewer) => self.channels.is_subscribed(viewer, &channel.id).await?,
            None => false,
        };

        Ok(ChannelProfile {
            full_name: channel.full_name,
            username: channel.username,
            email: channel.email,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
        })
    }

    /// Watched videos in history order, each with its owner's public fields.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchedVideo>> {
        let user = self.load_user(user_id).await?;
        let videos = self.channels.get_videos(&user.watch_history).await?;

        let mut owners: HashMap<String, Option<OwnerProfile>> = HashMap::new();
        let mut history = Vec::with_capacity(videos.len());

        for video in videos {
            if !owners.contains_key(&video.owner_id) {
                let owner = self.users.get_user(&video.owner_id).await?;
                owners.insert(
                    video.owner_id.clone(),
                    owner.as_ref().map(OwnerProfile::from),
                );
            }

            match owners.get(&video.owner_id).cloned().flatten() {
                Some(owner) => history.push(WatchedVideo::new(video, owner)),
                None => {
                    tracing::debug!(video_id = %video.id, "Skipping video with missing owner")
                }
            }
        }

        Ok(history)
    }
}
