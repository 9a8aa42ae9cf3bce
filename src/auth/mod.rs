// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! # Authentication Module
//!
//! Session and CSRF handling for the directory API.
//!
//! ## Flow
//!
//! 1. The front end logs in (or registers) over a CSRF-protected endpoint
//! 2. The server sets a signed, HttpOnly `auth` cookie carrying the
//!    subject name and email
//! 3. A signed, non-HttpOnly `csrf` cookie carries a random code that the
//!    front end echoes in the `X-CSRF-TOKEN` header on every state-changing
//!    request (double-submit pattern), optionally bound to the subject
//! 4. On every guarded request the session claim is re-checked against the
//!    live account store; cryptographic validity alone is never trusted
//!
//! ## Security
//!
//! - All tokens are HS256-signed with a process-wide key loaded at startup
//! - Verification fails closed: any decode failure means "no valid claim"
//! - Session failures are logged and mapped to 401 by guards, never thrown

pub mod csrf;
pub mod password;
pub mod session;
pub mod token;

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

pub use session::SessionClaims;
pub use token::{TokenCodec, TokenError};

/// Failure to render a cookie header (bad signing key state or a value that
/// is not a legal header).
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("failed to sign cookie token: {0}")]
    Sign(#[from] TokenError),
    #[error("cookie value is not a valid header: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}

/// Render a `Set-Cookie` value. All cookies share `Path=/` and
/// `SameSite=Lax`; `Secure` is appended outside development.
pub fn build_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue, CookieError> {
    let mut cookie = format!("{name}={value}; Path=/; SameSite=Lax; Max-Age={max_age_seconds}");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

/// Extract a single cookie value from the request `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next().unwrap_or_default().trim();
        let Some(val) = parts.next() else { continue };
        if key == name {
            return Some(val.trim().to_string());
        }
    }
    None
}
