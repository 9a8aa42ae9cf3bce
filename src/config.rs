// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! # Runtime Configuration
//!
//! Configuration is read from the environment exactly once at startup into
//! an immutable [`AppConfig`], which is shared by reference through
//! `AppState`. Nothing in the process mutates configuration after load; in
//! particular the signing and verification secrets are never rotated at
//! runtime.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENVIRONMENT` | `development` or `production` | `development` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SESSION_SECRET` | HS256 key for session/CSRF tokens | Required in production |
//! | `VERIFICATION_SECRET` | HMAC key for proof challenges | Required in production |
//! | `PUBLIC_BASE_URL` | Base URL embedded in proof links | `http://localhost:3000` |
//! | `REVIEWER_USER` | Account name allowed to review proofs | Unset (reviews disabled) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |

use std::env;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable {0}: {1}")]
    InvalidVar(&'static str, String),
}

/// Deployment environment. Controls the `Secure` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Symmetric signing key for the token codec.
    pub session_secret: String,
    /// Keyed-hash secret for verification challenges.
    pub verification_secret: String,
    /// Public site base URL, embedded in proof URLs.
    pub public_base_url: Url,
    /// Account name permitted to approve/reject verification requests.
    pub reviewer: Option<String>,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// In development the secrets fall back to fixed placeholder values so
    /// the server can run without setup; production refuses to start
    /// without real secrets.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            Ok("development") | Err(_) => Environment::Development,
            Ok(other) => {
                return Err(ConfigError::InvalidVar("ENVIRONMENT", other.to_string()));
            }
        };

        let session_secret = secret_var("SESSION_SECRET", environment)?;
        let verification_secret = secret_var("VERIFICATION_SECRET", environment)?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidVar("PORT", raw))?,
            Err(_) => 8080,
        };

        let base_raw =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let public_base_url =
            Url::parse(&base_raw).map_err(|_| ConfigError::InvalidVar("PUBLIC_BASE_URL", base_raw))?;

        Ok(Self {
            environment,
            host,
            port,
            session_secret,
            verification_secret,
            public_base_url,
            reviewer: env::var("REVIEWER_USER").ok(),
        })
    }

    /// Whether cookies carry the `Secure` attribute. Everything outside
    /// development is assumed to be served over HTTPS.
    pub fn cookie_secure(&self) -> bool {
        self.environment != Environment::Development
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 0,
            session_secret: "test-session-secret".to_string(),
            verification_secret: "test-verification-secret".to_string(),
            public_base_url: Url::parse("http://localhost:3000").unwrap(),
            reviewer: Some("reviewer".to_string()),
        }
    }
}

fn secret_var(name: &'static str, environment: Environment) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ if environment == Environment::Development => {
            tracing::warn!("{name} not set, using development placeholder");
            Ok(format!("dev-{}", name.to_lowercase()))
        }
        _ => Err(ConfigError::MissingVar(name)),
    }
}
