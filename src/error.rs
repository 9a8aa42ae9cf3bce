// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! API error type and the stable machine-readable error codes.
//!
//! Every failure the server reports to a client carries a JSON body with a
//! stable `error` code (or `{message, property}` for body validation). The
//! front end matches on these codes, so they are part of the external
//! contract and must never change.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Stable wire-level error codes.
pub mod codes {
    pub const CSRF_NO_COOKIE: &str = "CSRF_NO_COOKIE";
    pub const CSRF_NO_HEADER: &str = "CSRF_NO_HEADER";
    pub const CSRF_VERIFY_FAILED: &str = "CSRF_VERIFY_FAILED";
    pub const CSRF_COOKIE_MISSING_CODE: &str = "CSRF_COOKIE_MISSING_CODE";
    pub const CSRF_COOKIE_HEADER_MISMATCH: &str = "CSRF_COOKIE_HEADER_MISMATCH";
    pub const CSRF_AUTH_MISMATCH: &str = "CSRF_AUTH_MISMATCH";

    pub const AUTH_NO_COOKIE: &str = "AUTH_NO_COOKIE";
    pub const AUTH_VERIFY_FAILED: &str = "AUTH_VERIFY_FAILED";
    pub const AUTH_STALE_ACCOUNT: &str = "AUTH_STALE_ACCOUNT";
    pub const AUTH_PATH_MISMATCH: &str = "AUTH_PATH_MISMATCH";

    pub const BODY_INVALID_JSON: &str = "BODY_INVALID_JSON";
    pub const BODY_UNEXPECTED_PROPERTIES: &str = "BODY_UNEXPECTED_PROPERTIES";

    pub const WRONG_PASSWORD: &str = "WRONG_PASSWORD";
    pub const UNKNOWN_EMAIL: &str = "UNKNOWN_EMAIL";
    pub const UNKNOWN_USER: &str = "UNKNOWN_USER";
    pub const DUPLICATE_EMAIL: &str = "DUPLICATE_EMAIL";
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";

    pub const UNKNOWN_IDENTITY: &str = "UNKNOWN_IDENTITY";
    pub const NOT_OWNER: &str = "NOT_OWNER";
    pub const NOT_PENDING: &str = "NOT_PENDING";
    pub const REVIEW_FORBIDDEN: &str = "REVIEW_FORBIDDEN";

    pub const INTERNAL: &str = "INTERNAL";
}

/// An error response with a fixed status code and JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    /// A `{error: CODE}` body with an arbitrary status.
    pub fn code(status: StatusCode, code: &str) -> Self {
        Self {
            status,
            body: json!({ "error": code }),
        }
    }

    pub fn bad_request(code: &str) -> Self {
        Self::code(StatusCode::BAD_REQUEST, code)
    }

    pub fn unauthorized(code: &str) -> Self {
        Self::code(StatusCode::UNAUTHORIZED, code)
    }

    /// Body validation failure: `{message, property}`.
    ///
    /// `property` is null when the offending property cannot be determined
    /// from the deserializer error.
    pub fn validation(message: impl Into<String>, property: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "message": message.into(), "property": property }),
        }
    }

    /// Body carried properties outside the endpoint schema.
    pub fn unexpected_properties(properties: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({
                "error": codes::BODY_UNEXPECTED_PROPERTIES,
                "properties": properties,
            }),
        }
    }

    /// Infrastructure failure. The detail is logged server-side; the client
    /// only ever sees the opaque `INTERNAL` code.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("internal error: {detail}");
        Self::code(StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
