// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user ID (also used as document ID and token subject)
    pub id: String,
    /// Unique, stored lowercase
    pub username: String,
    /// Unique, stored lowercase
    pub email: String,
    pub full_name: String,
    /// Avatar image URL
    pub avatar: String,
    /// Cover image URL
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Argon2 PHC digest, never plaintext
    pub password: String,
    /// The one refresh token currently accepted for this user
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Watched video IDs, oldest first
    #[serde(default)]
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public view of a user: everything except the password digest and refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            watch_history: user.watch_history.clone(),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

/// Owner fields embedded in watch-history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerProfile {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

impl From<&User> for OwnerProfile {
    fn from(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}
