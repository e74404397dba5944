// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Token secrets are read once at startup and held in memory for the
//! lifetime of the process.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Browser origin allowed by CORS
    pub cors_origin: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Where user records live
    pub store_backend: StoreBackend,
    /// Emit the `Secure` attribute on session cookies
    pub cookie_secure: bool,
    /// Lifetime of access tokens
    pub access_token_ttl: Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_ttl: Duration,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes), distinct from the access key
    pub refresh_token_secret: Vec<u8>,
}

impl Config {
    /// Config for tests: fixed secrets and short token lifetimes.
    pub fn test_default() -> Self {
        Self {
            cors_origin: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            cookie_secure: false,
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(24 * 60 * 60),
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimu".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend: match env::var("STORE_BACKEND") {
                Ok(v) if v.trim().eq_ignore_ascii_case("memory") => StoreBackend::Memory,
                Ok(v) if v.trim().eq_ignore_ascii_case("firestore") => StoreBackend::Firestore,
                Ok(v) => {
                    return Err(ConfigError::Invalid {
                        name: "STORE_BACKEND",
                        value: v,
                    })
                }
                Err(_) => StoreBackend::Firestore,
            },
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                .unwrap_or(true),
            access_token_ttl: ttl_from_env("ACCESS_TOKEN_EXPIRY", "1d")?,
            refresh_token_ttl: ttl_from_env("REFRESH_TOKEN_EXPIRY", "10d")?,
            access_token_secret: secret_from_env("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: secret_from_env("REFRESH_TOKEN_SECRET")?,
        })
    }
}

/// Persistence backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore (or its emulator)
    Firestore,
    /// Process-local store, data is lost on restart
    Memory,
}

fn secret_from_env(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.as_bytes().to_vec())
}

fn ttl_from_env(name: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_ttl(&raw).ok_or(ConfigError::Invalid { name, value: raw })
}

/// Parse a token lifetime such as `900`, `15m`, `1h` or `10d`.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        _ => (raw, 's'),
    };

    let value: u64 = digits.trim().parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };

    let secs = value.checked_mul(multiplier)?;
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
