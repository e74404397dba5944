// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod password;
pub mod session;
pub mod tokens;

pub use account::AccountService;
pub use session::{LoginCredentials, LoginOutcome, Registration, SessionService, TokenPair};
pub use tokens::{Claims, TokenError, TokenKind, TokenService};
