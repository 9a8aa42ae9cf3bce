// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! HTTP API: router assembly and OpenAPI documentation.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::csrf,
    models::{
        ChallengeResponse, ContactMessage, ContactRequest, CreateIdentityRequest, Identity,
        IdentityStatus, LoginRequest, Network, ProofPlacement, RegisterRequest, ReviewRequest,
        SessionResponse, StatusResponse, UpdateIdentityRequest, UpdateUserRequest,
        VerificationRequest, VerifySubmitRequest,
    },
    state::AppState,
};

pub mod auth;
pub mod contact;
pub mod identities;
pub mod users;
pub mod verify;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/users", post(users::register))
        .route(
            "/users/{name}",
            axum::routing::patch(users::update_user).delete(users::delete_user),
        )
        .route("/identities", post(identities::create_identity))
        .route(
            "/identities/{network}/{id}",
            axum::routing::patch(identities::update_identity)
                .delete(identities::delete_identity),
        )
        .route("/verify", post(verify::submit_verification))
        .route("/verify/challenge", get(verify::get_challenge))
        .route("/verify/review", post(verify::review_verification))
        .route("/contact", post(contact::submit_contact))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Rotate the CSRF cookie on navigation; must wrap the whole tree so
        // a first page hit gets a token before any form is submitted.
        .layer(middleware::from_fn_with_state(state, csrf::refresh))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::logout,
        users::register,
        users::update_user,
        users::delete_user,
        identities::create_identity,
        identities::update_identity,
        identities::delete_identity,
        verify::get_challenge,
        verify::submit_verification,
        verify::review_verification,
        contact::submit_contact,
    ),
    components(
        schemas(
            Network,
            ProofPlacement,
            IdentityStatus,
            Identity,
            VerificationRequest,
            ContactMessage,
            LoginRequest,
            RegisterRequest,
            UpdateUserRequest,
            CreateIdentityRequest,
            UpdateIdentityRequest,
            VerifySubmitRequest,
            ReviewRequest,
            ContactRequest,
            SessionResponse,
            ChallengeResponse,
            StatusResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Login and session lifecycle"),
        (name = "Users", description = "Account management"),
        (name = "Identities", description = "External platform handles"),
        (name = "Verification", description = "Ownership proof protocol"),
        (name = "Contact", description = "Public contact form")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{csrf, session};
    use crate::error::codes;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::COOKIE, header::SET_COOKIE, HeaderValue, Request, StatusCode};
    use tower::ServiceExt;

    fn cookie_pair(value: &HeaderValue) -> String {
        value
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn contact_scenario_with_matching_header() {
        let state = AppState::for_tests();
        let (csrf_cookie, code) =
            csrf::issue(&state.codec, &state.config, Some("tester")).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(COOKIE, cookie_pair(&csrf_cookie))
            .header("X-CSRF-TOKEN", &code)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"Test message."}"#))
            .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["email"], serde_json::Value::Null);

        let store = state.store.read().await;
        assert_eq!(store.contact_messages().len(), 1);
    }

    #[tokio::test]
    async fn contact_scenario_cookie_without_code() {
        let state = AppState::for_tests();
        let token = state
            .codec
            .sign(
                serde_json::json!({"sub": "tester"}),
                chrono::Duration::hours(6),
            )
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(COOKIE, format!("csrf={token}"))
            .header("X-CSRF-TOKEN", "f424145bf229f32d")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"Test message."}"#))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], codes::CSRF_COOKIE_MISSING_CODE);
    }

    #[tokio::test]
    async fn patch_under_wrong_session_writes_nothing() {
        let state = AppState::for_tests();
        {
            let mut store = state.store.write().await;
            store
                .create_account("alice", "alice@example.com", "hash")
                .unwrap();
            store
                .create_account("bob", "bob@example.com", "hash")
                .unwrap();
        }
        let auth_cookie = session::issue(
            &state.codec,
            &state.config,
            "bob",
            "bob@example.com",
            session::default_expiry(),
        )
        .unwrap();
        let (csrf_cookie, code) = csrf::issue(&state.codec, &state.config, Some("bob")).unwrap();

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/users/alice")
            .header(
                COOKIE,
                format!("{}; {}", cookie_pair(&auth_cookie), cookie_pair(&csrf_cookie)),
            )
            .header("X-CSRF-TOKEN", &code)
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"password":"hunter2","newEmail":"stolen@example.com"}"#,
            ))
            .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let store = state.store.read().await;
        assert_eq!(
            store.account_by_name("alice").unwrap().email,
            "alice@example.com"
        );
    }

    #[tokio::test]
    async fn get_without_csrf_cookie_receives_one() {
        let state = AppState::for_tests();
        let request = Request::builder()
            .method("GET")
            .uri("/api/logout")
            .body(Body::empty())
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        let fresh: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter(|v| v.to_str().unwrap().starts_with("csrf="))
            .collect();
        // Logout clears csrf, and the refresh middleware appends a fresh one.
        assert!(fresh
            .iter()
            .any(|v| !v.to_str().unwrap().contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn fresh_csrf_cookie_is_not_rotated_again() {
        let state = AppState::for_tests();
        let (csrf_cookie, _code) = csrf::issue(&state.codec, &state.config, None).unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/api/verify/challenge?network=twitch&externalName=alice_tv")
            .header(COOKIE, cookie_pair(&csrf_cookie))
            .body(Body::empty())
            .unwrap();

        // 401 (no session) but the middleware still runs; a token outside
        // the refresh window must not be replaced.
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn post_requests_never_rotate_csrf() {
        let state = AppState::for_tests();
        let request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"], codes::CSRF_NO_COOKIE);
    }
}
