// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VidTube accounts: user registration, sessions and profiles for the
//! video-sharing backend.
//!
//! Sessions use a short-lived access token plus a single stored refresh
//! token per user that is rotated on every refresh.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{ChannelStore, CredentialStore};
use services::{AccountService, SessionService, TokenService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: TokenService,
    pub sessions: SessionService,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire services over the given stores.
    pub fn new(
        config: Config,
        users: Arc<dyn CredentialStore>,
        channels: Arc<dyn ChannelStore>,
    ) -> Self {
        let tokens = TokenService::from_config(&config);
        Self {
            sessions: SessionService::new(users.clone(), tokens.clone()),
            accounts: AccountService::new(users, channels),
            tokens,
            config,
        }
    }
}
