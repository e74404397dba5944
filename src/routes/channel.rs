// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public channel page. Signed-in callers also learn whether they subscribe.

use crate::error::Result;
use crate::middleware::auth::optional_auth_user;
use crate::models::ChannelProfile;
use crate::routes::response::ApiResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/users/c/{username}", get(get_channel_profile))
}

async fn get_channel_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<ApiResponse<ChannelProfile>> {
    let viewer = optional_auth_user(&state, &jar, &headers);

    tracing::debug!(
        username = %username,
        viewer = ?viewer.as_ref().map(|v| &v.user_id),
        "Fetching channel profile"
    );

    let profile = state
        .accounts
        .channel_profile(&username, viewer.as_ref().map(|v| v.user_id.as_str()))
        .await?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}
