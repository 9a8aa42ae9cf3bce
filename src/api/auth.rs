// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Login and logout endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::{
    auth::{csrf, password, session},
    error::{codes, ApiError},
    models::{LoginRequest, SessionResponse},
    pipeline::{Chain, RequestContext, RequireCsrf, ValidateBody},
    state::AppState,
};

/// Authenticate with email and password.
///
/// On success sets the `auth` session cookie and reissues the `csrf` cookie
/// bound to the authenticated subject.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = SessionResponse),
        (status = 400, description = "CSRF or body validation failure"),
        (status = 401, description = "WRONG_PASSWORD or UNKNOWN_EMAIL"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireCsrf)
        .guard(ValidateBody::<LoginRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let request: LoginRequest = ctx.take_body()?;

    let account = {
        let store = state.store.read().await;
        store
            .account_by_email(&request.email)
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(codes::UNKNOWN_EMAIL))?
    };
    if !password::verify_password(&request.password, &account.password_hash) {
        return Err(ApiError::unauthorized(codes::WRONG_PASSWORD));
    }

    let auth_cookie = session::issue(
        &state.codec,
        &state.config,
        &account.name,
        &account.email,
        session::default_expiry(),
    )
    .map_err(ApiError::internal)?;
    let (csrf_cookie, _) =
        csrf::issue(&state.codec, &state.config, Some(&account.name)).map_err(ApiError::internal)?;

    let mut response_headers = HeaderMap::new();
    response_headers.append(SET_COOKIE, auth_cookie);
    response_headers.append(SET_COOKIE, csrf_cookie);
    Ok((
        StatusCode::OK,
        response_headers,
        Json(SessionResponse {
            name: account.name,
            email: account.email,
        }),
    )
        .into_response())
}

/// Clear the session and CSRF cookies and send the browser home.
#[utoipa::path(
    get,
    path = "/api/logout",
    tag = "Auth",
    responses((status = 303, description = "Cookies cleared, redirect to /"))
)]
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let auth_cookie = session::revoke(&state.config).map_err(ApiError::internal)?;
    let csrf_cookie = crate::auth::build_cookie(
        csrf::CSRF_COOKIE,
        "revoked",
        0,
        false,
        state.config.cookie_secure(),
    )
    .map_err(ApiError::internal)?;

    let mut response_headers = HeaderMap::new();
    response_headers.append(SET_COOKIE, auth_cookie);
    response_headers.append(SET_COOKIE, csrf_cookie);
    Ok((response_headers, Redirect::to("/")).into_response())
}
