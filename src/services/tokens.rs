// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token issuance and verification (HS256 JWTs).
//!
//! Access and refresh tokens are signed with different keys, so a token of
//! one kind never verifies as the other.

use crate::config::Config;
use crate::error::{AppError, AuthFailure};
use crate::time_utils::unix_now;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JWT claims shared by both token kinds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Random token ID; two tokens issued in the same second still differ
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token errors. `Expired` and `Invalid` are kept apart for diagnostics even
/// though both become 401 at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthorized(AuthFailure::ExpiredToken),
            TokenError::Invalid(_) => AppError::Unauthorized(AuthFailure::InvalidToken),
            TokenError::Signing(msg) => {
                AppError::Internal(anyhow::anyhow!("Token signing failed: {}", msg))
            }
        }
    }
}

#[derive(Clone)]
struct SigningKey {
    secret: Vec<u8>,
    ttl: Duration,
}

/// Issues and verifies both token kinds.
#[derive(Clone)]
pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenService {
    pub fn new(
        access_secret: Vec<u8>,
        access_ttl: Duration,
        refresh_secret: Vec<u8>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: SigningKey {
                secret: access_secret,
                ttl: access_ttl,
            },
            refresh: SigningKey {
                secret: refresh_secret,
                ttl: refresh_ttl,
            },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.access_token_secret.clone(),
            config.access_token_ttl,
            config.refresh_token_secret.clone(),
            config.refresh_token_ttl,
        )
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of tokens of the given kind.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.key(kind).ttl
    }

    pub fn issue_access_token(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, TokenKind::Access, unix_now())
    }

    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, TokenKind::Refresh, unix_now())
    }

    /// Sign a token as if issued at `issued_at` (Unix seconds).
    pub fn issue_at(
        &self,
        user_id: &str,
        kind: TokenKind,
        issued_at: u64,
    ) -> Result<String, TokenError> {
        let key = self.key(kind);
        if key.secret.is_empty() {
            return Err(TokenError::Signing("signing secret is not configured".into()));
        }

        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(key.ttl.as_secs()),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&key.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let key = self.key(kind);
        if key.secret.is_empty() {
            return Err(TokenError::Invalid("verification secret is not configured".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&key.secret), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        // jsonwebtoken accepts exp == now; a token is only valid while exp > now
        if data.claims.exp <= unix_now() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
