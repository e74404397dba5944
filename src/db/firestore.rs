// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (credentials, profile, refresh token)
//! - Subscriptions (channel follower counts)
//! - Videos (watch-history lookups)

use super::{collections, ChannelStore, CredentialStore, ProfileUpdate};
use crate::error::AppError;
use crate::models::{Subscription, User, Video};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreWritePrecondition};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;
const MAX_ROTATE_ATTEMPTS: usize = 5;

// Partial user documents. Writes carry a field mask, so fields outside the
// mask (credentials in particular) are left as stored.

#[derive(Serialize, Deserialize)]
struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_image: Option<String>,
    updated_at: String,
}

#[derive(Serialize, Deserialize)]
struct RefreshTokenPatch {
    refresh_token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PasswordPatch {
    password: String,
    updated_at: String,
}

fn user_write_error(user_id: &str, err: FirestoreError) -> AppError {
    match err {
        FirestoreError::DataNotFoundError(_) => {
            AppError::NotFound(format!("User {} not found", user_id))
        }
        other => AppError::Database(other.to_string()),
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// First user whose `field` equals `value`.
    async fn find_user_by_field(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<Option<User>, AppError> {
        let value = value.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field(field).eq(value.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    async fn count_subscriptions_where(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<u64, AppError> {
        let value = value.to_string();
        let subscriptions: Vec<Subscription> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.field(field).eq(value.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(subscriptions.len() as u64)
    }

    /// One compare-and-swap attempt. The read goes through the transaction,
    /// so the commit fails if another writer changed the user in between.
    async fn try_rotate_refresh_token(
        client: &firestore::FirestoreDb,
        user_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, FirestoreError> {
        let mut transaction = client.begin_transaction().await?;

        let current: Option<User> = client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await?;

        if current.and_then(|u| u.refresh_token).as_deref() != Some(expected) {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        let patch = RefreshTokenPatch {
            refresh_token: Some(replacement.to_string()),
        };

        client
            .fluent()
            .update()
            .fields(["refresh_token"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&patch)
            .add_to_transaction(&mut transaction)?;

        transaction.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl CredentialStore for FirestoreDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("email", email).await
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        // Firestore has no unique indexes; this check narrows but does not
        // close the window between two simultaneous registrations.
        if self.find_user_by_username(&user.username).await?.is_some()
            || self.find_user_by_email(&user.email).await?.is_some()
        {
            return Err(AppError::Conflict(
                "user with email or username already exists".to_string(),
            ));
        }

        // `insert` fails if the document ID already exists
        let _: User = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, AppError> {
        let patch = ProfilePatch {
            full_name: update.full_name.clone(),
            email: update.email.clone(),
            avatar: update.avatar.clone(),
            cover_image: update.cover_image.clone(),
            updated_at: now_rfc3339(),
        };

        let mut mask = vec!["updated_at"];
        if patch.full_name.is_some() {
            mask.push("full_name");
        }
        if patch.email.is_some() {
            mask.push("email");
        }
        if patch.avatar.is_some() {
            mask.push("avatar");
        }
        if patch.cover_image.is_some() {
            mask.push("cover_image");
        }

        // No unique index on email; a concurrent claim can slip past this check
        if let Some(email) = &patch.email {
            if let Some(other) = self.find_user_by_email(email).await? {
                if other.id != user_id {
                    return Err(AppError::Conflict("email is already in use".to_string()));
                }
            }
        }

        self.get_client()?
            .fluent()
            .update()
            .fields(mask)
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&patch)
            .execute::<User>()
            .await
            .map_err(|e| user_write_error(user_id, e))
    }

    async fn set_refresh_token(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        let patch = RefreshTokenPatch {
            refresh_token: token.map(str::to_string),
        };

        let result = self
            .get_client()?
            .fluent()
            .update()
            .fields(["refresh_token"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&patch)
            .execute::<User>()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataNotFoundError(_)) => {
                tracing::debug!(user_id, "No user to update refresh token for");
                Ok(())
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn rotate_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let client = self.get_client()?;

        let mut attempt = 1;
        loop {
            match Self::try_rotate_refresh_token(client, user_id, expected, replacement).await
            {
                Ok(rotated) => return Ok(rotated),
                // Contention aborts the commit; the next attempt re-reads the token
                Err(FirestoreError::DatabaseError(e))
                    if e.retry_possible && attempt < MAX_ROTATE_ATTEMPTS =>
                {
                    tracing::debug!(user_id, attempt, error = %e, "Retrying refresh token rotation");
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "Refresh token rotation failed: {}",
                        e
                    )))
                }
            }
        }
    }

    async fn set_password(&self, user_id: &str, digest: &str) -> Result<(), AppError> {
        let patch = PasswordPatch {
            password: digest.to_string(),
            updated_at: now_rfc3339(),
        };

        let _: User = self
            .get_client()?
            .fluent()
            .update()
            .fields(["password", "updated_at"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| user_write_error(user_id, e))?;
        Ok(())
    }
}

#[async_trait]
impl ChannelStore for FirestoreDb {
    async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        self.count_subscriptions_where("channel_id", channel_id)
            .await
    }

    async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        self.count_subscriptions_where("subscriber_id", subscriber_id)
            .await
    }

    async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        let subscription: Option<Subscription> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(&Subscription::document_id(subscriber_id, channel_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(subscription.is_some())
    }

    async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Video>, AppError> {
        let client = self.get_client()?;

        // `buffered` keeps results in input order
        let videos = stream::iter(video_ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::VIDEOS)
                    .obj::<Video>()
                    .one(&id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Video>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Video>>, AppError>>()?;

        Ok(videos.into_iter().flatten().collect())
    }
}
