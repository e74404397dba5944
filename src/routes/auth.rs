// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public session routes: register, login and token refresh.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::REFRESH_TOKEN_COOKIE;
use crate::models::UserProfile;
use crate::routes::cookies::set_session_cookies;
use crate::routes::response::ApiResponse;
use crate::services::{LoginCredentials, Registration};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_token))
}

/// Registration body. Media fields are URLs returned by the upload service.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email address is not valid"))]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Create an account. Responds 201 with the new profile.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<ApiResponse<UserProfile>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = state
        .sessions
        .register(Registration {
            full_name: request.full_name.unwrap_or_default(),
            email: request.email.unwrap_or_default(),
            password: request.password.unwrap_or_default(),
            username: request.username.unwrap_or_default(),
            avatar: request.avatar.unwrap_or_default(),
            cover_image: request.cover_image,
        })
        .await?;

    Ok(ApiResponse::created(profile, "User registered successfully"))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Log in by username or email. Sets both session cookies.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let outcome = state
        .sessions
        .login(LoginCredentials {
            username: request.username,
            email: request.email,
            password: request.password.unwrap_or_default(),
        })
        .await?;

    let jar = set_session_cookies(
        jar,
        &state.tokens,
        &outcome.tokens,
        state.config.cookie_secure,
    );

    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: outcome.user,
                access_token: outcome.tokens.access_token,
                refresh_token: outcome.tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokensResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Rotate the refresh token. Reads the cookie first, then an optional JSON body.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokensResponse>)> {
    let presented = match jar.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) => Some(cookie.value().to_string()),
        None if body.is_empty() => None,
        None => {
            serde_json::from_slice::<RefreshRequest>(&body)
                .map_err(|e| AppError::Validation(format!("invalid request body: {}", e)))?
                .refresh_token
        }
    };

    let pair = state.sessions.refresh(presented.as_deref()).await?;

    let jar = set_session_cookies(jar, &state.tokens, &pair, state.config.cookie_secure);

    Ok((
        jar,
        ApiResponse::ok(
            TokensResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}
