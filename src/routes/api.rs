// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{UserProfile, WatchedVideo};
use crate::routes::cookies::clear_session_cookies;
use crate::routes::response::{ApiResponse, Empty};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via access token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/change-password", post(change_password))
        .route("/api/v1/users/current-user", get(current_user))
        .route("/api/v1/users/update-account", patch(update_account))
        .route("/api/v1/users/avatar", patch(update_avatar))
        .route("/api/v1/users/cover-image", patch(update_cover_image))
        .route("/api/v1/users/history", get(watch_history))
}

// ─── Session ─────────────────────────────────────────────────

/// Log out: forget the stored refresh token and expire both cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Empty>)> {
    state.sessions.logout(&user.user_id).await?;

    let jar = clear_session_cookies(jar, state.config.cookie_secure);
    Ok((jar, ApiResponse::ok(Empty {}, "User logged out")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<Empty>> {
    state
        .sessions
        .change_password(&user.user_id, &request.old_password, &request.new_password)
        .await?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

// ─── Profile ─────────────────────────────────────────────────

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<UserProfile>> {
    let profile = state.accounts.current_user(&user.user_id).await?;
    Ok(ApiResponse::ok(profile, "Current user fetched successfully"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email address is not valid"))]
    email: Option<String>,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<ApiResponse<UserProfile>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = state
        .accounts
        .update_account_details(
            &user.user_id,
            request.full_name.as_deref().unwrap_or_default(),
            request.email.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::ok(profile, "Account details updated successfully"))
}

#[derive(Debug, Deserialize)]
struct AvatarRequest {
    #[serde(default)]
    avatar: String,
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<AvatarRequest>,
) -> Result<ApiResponse<UserProfile>> {
    let profile = state
        .accounts
        .update_avatar(&user.user_id, &request.avatar)
        .await?;
    Ok(ApiResponse::ok(profile, "Avatar updated successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverImageRequest {
    #[serde(default)]
    cover_image: String,
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CoverImageRequest>,
) -> Result<ApiResponse<UserProfile>> {
    let profile = state
        .accounts
        .update_cover_image(&user.user_id, &request.cover_image)
        .await?;
    Ok(ApiResponse::ok(profile, "Cover image updated successfully"))
}

// ─── Watch History ───────────────────────────────────────────

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchedVideo>>> {
    let history = state.accounts.watch_history(&user.user_id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
