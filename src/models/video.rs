// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video and subscription documents read by the channel and history views.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::user::OwnerProfile;

/// Uploaded video stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Video ID (also used as document ID)
    pub id: String,
    /// ID of the uploading user
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Video file URL
    pub video_file: String,
    /// Thumbnail image URL
    pub thumbnail: String,
    /// Length in seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub created_at: String,
}

fn default_published() -> bool {
    true
}

/// A subscriber following a channel. Document ID is `{subscriber_id}_{channel_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: String,
}

impl Subscription {
    pub fn document_id(subscriber_id: &str, channel_id: &str) -> String {
        format!("{}_{}", subscriber_id, channel_id)
    }
}

/// One watch-history entry: the video plus its owner's public fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WatchedVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    pub created_at: String,
    pub owner: OwnerProfile,
}

impl WatchedVideo {
    pub fn new(video: Video, owner: OwnerProfile) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            duration: video.duration,
            views: video.views,
            created_at: video.created_at,
            owner,
        }
    }
}

/// Channel page for a username.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribers_count: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub channels_subscribed_to_count: u64,
    pub is_subscribed: bool,
}
