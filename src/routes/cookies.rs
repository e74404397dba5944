// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookies carrying the access and refresh tokens.

use crate::middleware::auth::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::services::{TokenKind, TokenPair, TokenService};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

fn session_cookie(name: &'static str, value: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Add both token cookies, each living as long as its token.
pub fn set_session_cookies(
    jar: CookieJar,
    tokens: &TokenService,
    pair: &TokenPair,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        tokens.ttl(TokenKind::Access).as_secs(),
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        tokens.ttl(TokenKind::Refresh).as_secs(),
        secure,
    ))
}

/// Expire both token cookies. Attributes match the ones used when setting them.
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    let removal = |name: &'static str| {
        Cookie::build(name)
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
    };

    jar.remove(removal(ACCESS_TOKEN_COOKIE))
        .remove(removal(REFRESH_TOKEN_COOKIE))
}
