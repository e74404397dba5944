// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod user;
pub mod video;

pub use user::{OwnerProfile, User, UserProfile};
pub use video::{ChannelProfile, Subscription, Video, WatchedVideo};
