// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Account endpoints: registration, profile update, deletion.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::{csrf, password, session},
    error::{codes, ApiError},
    models::{RegisterRequest, SessionResponse, UpdateUserRequest},
    pipeline::{Chain, RequestContext, RequireAuth, RequireCsrf, RequireSubjectParam, ValidateBody},
    state::AppState,
    store::StoreError,
};

fn account_error(err: StoreError) -> ApiError {
    match err {
        StoreError::DuplicateName => ApiError::bad_request(codes::DUPLICATE_NAME),
        StoreError::DuplicateEmail => ApiError::bad_request(codes::DUPLICATE_EMAIL),
        StoreError::UnknownAccount => ApiError::bad_request(codes::UNKNOWN_USER),
        StoreError::UnknownIdentity => ApiError::bad_request(codes::UNKNOWN_IDENTITY),
    }
}

/// Build the auth-plus-csrf cookie pair for a (possibly new) subject.
fn session_cookies(state: &AppState, name: &str, email: &str) -> Result<HeaderMap, ApiError> {
    let auth_cookie = session::issue(
        &state.codec,
        &state.config,
        name,
        email,
        session::default_expiry(),
    )
    .map_err(ApiError::internal)?;
    let (csrf_cookie, _) =
        csrf::issue(&state.codec, &state.config, Some(name)).map_err(ApiError::internal)?;
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, auth_cookie);
    headers.append(SET_COOKIE, csrf_cookie);
    Ok(headers)
}

/// Register a new account. Issues a session immediately.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; session cookie set", body = SessionResponse),
        (status = 400, description = "DUPLICATE_EMAIL or DUPLICATE_NAME"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireCsrf)
        .guard(ValidateBody::<RegisterRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let request: RegisterRequest = ctx.take_body()?;

    let hash = password::hash_password(&request.password).map_err(ApiError::internal)?;
    let account = {
        let mut store = state.store.write().await;
        store
            .create_account(request.name, request.email, hash)
            .map_err(account_error)?
    };

    let response_headers = session_cookies(&state, &account.name, &account.email)?;
    Ok((
        StatusCode::CREATED,
        response_headers,
        Json(SessionResponse {
            name: account.name,
            email: account.email,
        }),
    )
        .into_response())
}

/// Update name, email, or password. Requires the current password and a
/// session for the account named in the path. Reissues the session cookie
/// so the live-state re-check keeps passing after the change.
#[utoipa::path(
    patch,
    path = "/api/users/{name}",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated; fresh session cookie set", body = SessionResponse),
        (status = 400, description = "WRONG_PASSWORD or UNKNOWN_USER"),
        (status = 401, description = "Session subject does not match the path"),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut ctx = RequestContext::new(headers, body).with_subject_param(&name);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .guard(RequireSubjectParam)
        .guard(ValidateBody::<UpdateUserRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let request: UpdateUserRequest = ctx.take_body()?;

    let account = {
        let store = state.store.read().await;
        store
            .account_by_name(&name)
            .cloned()
            .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_USER))?
    };
    if !password::verify_password(&request.password, &account.password_hash) {
        return Err(ApiError::bad_request(codes::WRONG_PASSWORD));
    }

    let new_hash = request
        .new_password
        .as_deref()
        .map(password::hash_password)
        .transpose()
        .map_err(ApiError::internal)?;

    let updated = {
        let mut store = state.store.write().await;
        store
            .update_account(&name, request.new_name, request.new_email, new_hash)
            .map_err(account_error)?
    };

    let response_headers = session_cookies(&state, &updated.name, &updated.email)?;
    Ok((
        StatusCode::OK,
        response_headers,
        Json(SessionResponse {
            name: updated.name,
            email: updated.email,
        }),
    )
        .into_response())
}

/// Delete the account named in the path, along with its identities.
#[utoipa::path(
    delete,
    path = "/api/users/{name}",
    tag = "Users",
    request_body = (),
    responses(
        (status = 200, description = "Account deleted; cookies cleared"),
        (status = 400, description = "UNKNOWN_USER"),
        (status = 401, description = "Session subject does not match the path"),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut ctx = RequestContext::new(headers, body).with_subject_param(&name);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .guard(RequireSubjectParam)
        .run(&mut ctx, &state)
        .await?;

    {
        let mut store = state.store.write().await;
        store.delete_account(&name).map_err(account_error)?;
    }

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
    Ok((StatusCode::OK, response_headers).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use axum::http::{header::COOKIE, HeaderValue};

    async fn state_with_account(name: &str, email: &str) -> AppState {
        let state = AppState::for_tests();
        let hash = hash_password("hunter2").unwrap();
        state
            .store
            .write()
            .await
            .create_account(name, email, hash)
            .unwrap();
        state
    }

    /// Request headers with a valid session and a CSRF token bound to it.
    fn authed_headers(state: &AppState, sub: &str, email: &str) -> HeaderMap {
        let auth_cookie = session::issue(
            &state.codec,
            &state.config,
            sub,
            email,
            session::default_expiry(),
        )
        .unwrap();
        let (csrf_cookie, code) = csrf::issue(&state.codec, &state.config, Some(sub)).unwrap();
        let pair = |value: &HeaderValue| {
            value
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string()
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}; {}", pair(&auth_cookie), pair(&csrf_cookie)))
                .unwrap(),
        );
        headers.insert(csrf::CSRF_HEADER, HeaderValue::from_str(&code).unwrap());
        headers
    }

    fn unauth_csrf_headers(state: &AppState) -> HeaderMap {
        let (cookie, code) = csrf::issue(&state.codec, &state.config, None).unwrap();
        let pair = cookie.to_str().unwrap().split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers.insert(csrf::CSRF_HEADER, HeaderValue::from_str(&code).unwrap());
        headers
    }

    #[tokio::test]
    async fn register_creates_account_and_session() {
        let state = AppState::for_tests();
        let body =
            Bytes::from(r#"{"name":"alice","email":"alice@example.com","password":"hunter2"}"#);
        let response = register(State(state.clone()), unauth_csrf_headers(&state), body)
            .await
            .expect("register succeeds");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);

        let store = state.store.read().await;
        assert!(store.account_by_name("alice").is_some());
    }

    #[tokio::test]
    async fn register_duplicate_email_is_400() {
        let state = state_with_account("alice", "alice@example.com").await;
        let body =
            Bytes::from(r#"{"name":"bob","email":"alice@example.com","password":"hunter2"}"#);
        let err = register(State(state.clone()), unauth_csrf_headers(&state), body)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body["error"], codes::DUPLICATE_EMAIL);
    }

    #[tokio::test]
    async fn update_requires_matching_path() {
        let state = state_with_account("bob", "bob@example.com").await;
        let body = Bytes::from(r#"{"password":"hunter2","newEmail":"x@example.com"}"#);
        let err = update_user(
            State(state.clone()),
            Path("alice".to_string()),
            authed_headers(&state, "bob", "bob@example.com"),
            body,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body["error"], codes::AUTH_PATH_MISMATCH);

        // No write happened.
        let store = state.store.read().await;
        assert_eq!(
            store.account_by_name("bob").unwrap().email,
            "bob@example.com"
        );
    }

    #[tokio::test]
    async fn update_checks_current_password() {
        let state = state_with_account("alice", "alice@example.com").await;
        let body = Bytes::from(r#"{"password":"wrong","newEmail":"x@example.com"}"#);
        let err = update_user(
            State(state.clone()),
            Path("alice".to_string()),
            authed_headers(&state, "alice", "alice@example.com"),
            body,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body["error"], codes::WRONG_PASSWORD);
    }

    #[tokio::test]
    async fn rename_reissues_session_for_new_subject() {
        let state = state_with_account("alice", "alice@example.com").await;
        let body = Bytes::from(r#"{"password":"hunter2","newName":"alicia"}"#);
        let response = update_user(
            State(state.clone()),
            Path("alice".to_string()),
            authed_headers(&state, "alice", "alice@example.com"),
            body,
        )
        .await
        .expect("update succeeds");
        assert_eq!(response.status(), StatusCode::OK);

        // The fresh auth cookie must be valid for the renamed account.
        let auth_value = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .find(|v| v.to_str().unwrap().starts_with("auth="))
            .unwrap()
            .clone();
        let pair = auth_value.to_str().unwrap().split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());

        let store = state.store.read().await;
        let claims = session::extract(&headers, &store, &state.codec).expect("fresh session");
        assert_eq!(claims.sub, "alicia");
    }

    #[tokio::test]
    async fn delete_removes_account_and_clears_cookies() {
        let state = state_with_account("alice", "alice@example.com").await;
        let response = delete_user(
            State(state.clone()),
            Path("alice".to_string()),
            authed_headers(&state, "alice", "alice@example.com"),
            Bytes::new(),
        )
        .await
        .expect("delete succeeds");
        assert_eq!(response.status(), StatusCode::OK);
        for cookie in response.headers().get_all(SET_COOKIE) {
            assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
        }

        let store = state.store.read().await;
        assert!(store.account_by_name("alice").is_none());
    }
}
