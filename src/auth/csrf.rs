// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Double-submit CSRF protection with optional subject binding.
//!
//! A signed `csrf` cookie carries a random code; the front end echoes the
//! code in the `X-CSRF-TOKEN` header on every state-changing request. The
//! cookie is deliberately not HttpOnly so the front end can read the code.
//! Once a session exists the token is additionally bound to the subject,
//! so a token minted for user A cannot be replayed under user B's session.
//!
//! Lifecycle per browsing session: no token -> issued -> reissued near
//! expiry. The refresh middleware runs on GET requests and silently rotates
//! the cookie inside the refresh window, so a long-lived session never
//! presents an expired token.

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{build_cookie, cookie_value, session, CookieError, SessionClaims, TokenCodec};
use crate::{config::AppConfig, error::codes, state::AppState};

pub const CSRF_COOKIE: &str = "csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_TTL_SECONDS: i64 = 6 * 3600;
/// Reissue once the token is inside its final half-life.
pub const CSRF_REFRESH_WINDOW_SECONDS: i64 = CSRF_TTL_SECONDS / 2;

/// Claims inside the `csrf` cookie.
///
/// `code` is optional on the way in so foreign or legacy tokens without one
/// are reported as a distinct failure instead of a decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Bound subject, set once a session is known at mint time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// Validation failure kinds, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfRejection {
    NoCookie,
    NoHeader,
    VerifyFailed,
    MissingCode,
    CookieHeaderMismatch,
    AuthMismatch,
}

impl CsrfRejection {
    pub fn error_code(self) -> &'static str {
        match self {
            CsrfRejection::NoCookie => codes::CSRF_NO_COOKIE,
            CsrfRejection::NoHeader => codes::CSRF_NO_HEADER,
            CsrfRejection::VerifyFailed => codes::CSRF_VERIFY_FAILED,
            CsrfRejection::MissingCode => codes::CSRF_COOKIE_MISSING_CODE,
            CsrfRejection::CookieHeaderMismatch => codes::CSRF_COOKIE_HEADER_MISMATCH,
            CsrfRejection::AuthMismatch => codes::CSRF_AUTH_MISMATCH,
        }
    }
}

/// 16 hex chars of OS randomness.
fn new_code() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Mint a fresh CSRF cookie, bound to `sub` when one is known.
/// Returns the cookie header value and the embedded code.
pub fn issue(
    codec: &TokenCodec,
    config: &AppConfig,
    sub: Option<&str>,
) -> Result<(HeaderValue, String), CookieError> {
    let code = new_code();
    let token = codec.sign(
        CsrfClaims {
            code: Some(code.clone()),
            sub: sub.map(str::to_string),
        },
        chrono::Duration::seconds(CSRF_TTL_SECONDS),
    )?;
    let cookie = build_cookie(
        CSRF_COOKIE,
        &token,
        CSRF_TTL_SECONDS,
        false,
        config.cookie_secure(),
    )?;
    Ok((cookie, code))
}

/// Validate a state-changing request against the double-submit pattern.
///
/// Check order is fixed: cookie presence, header presence, cookie
/// verification, embedded code presence, code equality, subject binding.
pub fn check(
    headers: &HeaderMap,
    session: Option<&SessionClaims>,
    codec: &TokenCodec,
) -> Result<(), CsrfRejection> {
    let cookie = cookie_value(headers, CSRF_COOKIE).ok_or(CsrfRejection::NoCookie)?;
    let header_code = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(CsrfRejection::NoHeader)?;

    let verified = codec
        .verify::<CsrfClaims>(&cookie)
        .map_err(|_| CsrfRejection::VerifyFailed)?;
    let code = verified.claims.code.ok_or(CsrfRejection::MissingCode)?;

    if header_code != code {
        return Err(CsrfRejection::CookieHeaderMismatch);
    }
    if let Some(session) = session {
        if verified.claims.sub.as_deref() != Some(session.sub.as_str()) {
            return Err(CsrfRejection::AuthMismatch);
        }
    }
    Ok(())
}

/// Whether the current cookie should be replaced: absent, invalid, or
/// expiring inside the refresh window.
pub fn needs_refresh(headers: &HeaderMap, codec: &TokenCodec, now: i64) -> bool {
    let Some(cookie) = cookie_value(headers, CSRF_COOKIE) else {
        return true;
    };
    match codec.verify::<CsrfClaims>(&cookie) {
        Ok(verified) => verified.expires_at - now <= CSRF_REFRESH_WINDOW_SECONDS,
        Err(_) => true,
    }
}

/// Router middleware: rotate the CSRF cookie on navigation (GET) requests.
///
/// A token minted by one refresh sits outside the window until its own
/// half-life passes, so rapid repeated requests settle on a single active
/// token per refresh cycle.
pub async fn refresh(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let headers = request.headers().clone();
    let mut response = next.run(request).await;

    if method != Method::GET {
        return response;
    }
    if !needs_refresh(&headers, &state.codec, Utc::now().timestamp()) {
        return response;
    }

    let sub = {
        let store = state.store.read().await;
        session::extract(&headers, &store, &state.codec).map(|claims| claims.sub)
    };
    match issue(&state.codec, &state.config, sub.as_deref()) {
        Ok((cookie, _)) => {
            debug!("reissued csrf cookie (bound: {})", sub.is_some());
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Err(err) => error!("failed to reissue csrf cookie: {err}"),
    }
    response
}
