// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Session cookie lifecycle.
//!
//! The `auth` cookie carries a signed `{sub, email}` claim. Extraction
//! verifies the signature, then re-checks the pair against the live account
//! store: a cryptographically valid claim for a renamed, re-emailed, or
//! deleted account is rejected. Trusting the signature alone would leave
//! stale credentials usable after a profile change.

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_cookie, cookie_value, CookieError, TokenCodec, TokenError};
use crate::{config::AppConfig, error::codes, store::InMemoryStore};

pub const SESSION_COOKIE: &str = "auth";
pub const SESSION_TTL_SECONDS: i64 = 7 * 24 * 3600;

/// The authenticated caller's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account name.
    pub sub: String,
    pub email: String,
}

/// Why session extraction failed. Guards map these to 401 codes; plain
/// `extract` callers only see the absence of a session.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionRejection {
    NoCookie,
    VerifyFailed(TokenError),
    /// Signature was valid but the `(sub, email)` pair no longer matches a
    /// live account row.
    StaleAccount,
}

impl SessionRejection {
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionRejection::NoCookie => codes::AUTH_NO_COOKIE,
            SessionRejection::VerifyFailed(_) => codes::AUTH_VERIFY_FAILED,
            SessionRejection::StaleAccount => codes::AUTH_STALE_ACCOUNT,
        }
    }
}

/// Default session expiry for a login issued now.
pub fn default_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(SESSION_TTL_SECONDS)
}

/// Issue the `auth` cookie for a subject. Max-Age is derived from
/// `expires_at`; HttpOnly always, Secure outside development.
pub fn issue(
    codec: &TokenCodec,
    config: &AppConfig,
    sub: &str,
    email: &str,
    expires_at: DateTime<Utc>,
) -> Result<HeaderValue, CookieError> {
    let now = Utc::now();
    let max_age = (expires_at - now).num_seconds().max(0);
    let token = codec.sign_at(
        SessionClaims {
            sub: sub.to_string(),
            email: email.to_string(),
        },
        now.timestamp(),
        expires_at.timestamp(),
    )?;
    build_cookie(SESSION_COOKIE, &token, max_age, true, config.cookie_secure())
}

/// Issue a cookie that immediately expires the session.
pub fn revoke(config: &AppConfig) -> Result<HeaderValue, CookieError> {
    build_cookie(SESSION_COOKIE, "revoked", 0, true, config.cookie_secure())
}

/// Extract and fully validate the session, reporting why it failed.
pub fn extract_checked(
    headers: &HeaderMap,
    store: &InMemoryStore,
    codec: &TokenCodec,
) -> Result<SessionClaims, SessionRejection> {
    let token = cookie_value(headers, SESSION_COOKIE).ok_or(SessionRejection::NoCookie)?;
    let verified = codec
        .verify::<SessionClaims>(&token)
        .map_err(SessionRejection::VerifyFailed)?;
    let claims = verified.claims;
    if !store.account_matches(&claims.sub, &claims.email) {
        return Err(SessionRejection::StaleAccount);
    }
    Ok(claims)
}

/// Extract the session if one is present and valid; `None` otherwise.
///
/// This never errors: a missing or invalid session is a normal outcome
/// that callers treat as "not logged in". Failures are logged.
pub fn extract(
    headers: &HeaderMap,
    store: &InMemoryStore,
    codec: &TokenCodec,
) -> Option<SessionClaims> {
    match extract_checked(headers, store, codec) {
        Ok(claims) => Some(claims),
        Err(SessionRejection::NoCookie) => None,
        Err(rejection) => {
            debug!("session rejected: {}", rejection.error_code());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn setup() -> (AppConfig, TokenCodec, InMemoryStore) {
        let config = AppConfig::for_tests();
        let codec = TokenCodec::new(&config.session_secret);
        let mut store = InMemoryStore::new();
        store
            .create_account("alice", "alice@example.com", "hash")
            .expect("create account");
        (config, codec, store)
    }

    fn headers_with_cookie(cookie: &HeaderValue) -> HeaderMap {
        // Reuse the Set-Cookie value's name=value prefix as the request cookie.
        let pair = cookie
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[test]
    fn issue_then_extract_round_trips() {
        let (config, codec, store) = setup();
        let cookie = issue(
            &codec,
            &config,
            "alice",
            "alice@example.com",
            default_expiry(),
        )
        .unwrap();
        let headers = headers_with_cookie(&cookie);

        let claims = extract(&headers, &store, &codec).expect("valid session");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.email, "alice@example.com");
    }

    #[test]
    fn deleted_account_invalidates_valid_signature() {
        let (config, codec, mut store) = setup();
        let cookie = issue(
            &codec,
            &config,
            "alice",
            "alice@example.com",
            default_expiry(),
        )
        .unwrap();
        let headers = headers_with_cookie(&cookie);

        store.delete_account("alice").unwrap();
        assert_eq!(
            extract_checked(&headers, &store, &codec).unwrap_err(),
            SessionRejection::StaleAccount
        );
        assert!(extract(&headers, &store, &codec).is_none());
    }

    #[test]
    fn changed_email_invalidates_valid_signature() {
        let (config, codec, mut store) = setup();
        let cookie = issue(
            &codec,
            &config,
            "alice",
            "alice@example.com",
            default_expiry(),
        )
        .unwrap();
        let headers = headers_with_cookie(&cookie);

        store
            .update_account("alice", None, Some("changed@example.com".to_string()), None)
            .unwrap();
        assert_eq!(
            extract_checked(&headers, &store, &codec).unwrap_err(),
            SessionRejection::StaleAccount
        );
    }

    #[test]
    fn missing_cookie_is_no_session() {
        let (_, codec, store) = setup();
        let headers = HeaderMap::new();
        assert_eq!(
            extract_checked(&headers, &store, &codec).unwrap_err(),
            SessionRejection::NoCookie
        );
        assert!(extract(&headers, &store, &codec).is_none());
    }

    #[test]
    fn expired_session_is_rejected() {
        let (config, codec, store) = setup();
        let cookie = issue(
            &codec,
            &config,
            "alice",
            "alice@example.com",
            Utc::now() - Duration::seconds(10),
        )
        .unwrap();
        let headers = headers_with_cookie(&cookie);

        assert_eq!(
            extract_checked(&headers, &store, &codec).unwrap_err(),
            SessionRejection::VerifyFailed(TokenError::Expired)
        );
    }

    #[test]
    fn revoke_expires_immediately() {
        let (config, _, _) = setup();
        let cookie = revoke(&config).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
        assert!(cookie.to_str().unwrap().starts_with("auth=revoked"));
    }
}
