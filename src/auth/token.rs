// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Compact, expiring, tamper-evident token codec.
//!
//! All claims the server hands to clients (session identity, CSRF code) are
//! HS256-signed JWTs over a single process-wide secret. Every token carries
//! `iat`/`exp`; verification fails closed, mapping any decode problem to one
//! of three stable failure kinds.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

/// Claim envelope adding the timestamps the codec manages itself.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    #[serde(flatten)]
    claims: T,
    iat: i64,
    exp: i64,
}

/// A successfully verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    pub claims: T,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Signs and verifies claims with a symmetric key fixed at startup.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock-skew allowance: expiry must be deterministic.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign `claims`, valid from now for `ttl`.
    pub fn sign<T: Serialize>(&self, claims: T, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        self.sign_at(claims, now, now + ttl.num_seconds())
    }

    /// Sign with explicit timestamps. Exposed for expiry-sensitive callers
    /// (CSRF refresh decisions) and tests.
    pub fn sign_at<T: Serialize>(
        &self,
        claims: T,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, TokenError> {
        let envelope = Envelope {
            claims,
            iat: issued_at,
            exp: expires_at,
        };
        encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding)
            .map_err(|_| TokenError::Malformed)
    }

    /// Verify a token and recover its claims.
    ///
    /// Fails closed: any error during decode is reported as one of the
    /// three failure kinds, never treated as a valid claim.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<Verified<T>, TokenError> {
        let data = decode::<Envelope<T>>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;
        Ok(Verified {
            claims: data.claims.claims,
            issued_at: data.claims.iat,
            expires_at: data.claims.exp,
        })
    }
}
