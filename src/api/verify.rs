// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Verification endpoints: challenge rendering, proof submission, review.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};

use crate::{
    error::{codes, ApiError},
    models::{ChallengeQuery, ChallengeResponse, ReviewRequest, StatusResponse, VerifySubmitRequest},
    pipeline::{Chain, RequestContext, RequireAuth, RequireCsrf, ValidateBody},
    state::AppState,
    store::StoreError,
    verification::{self, ReviewError},
};

/// Generate a fresh ownership challenge for one of the caller's handles.
///
/// The challenge is deterministic over its inputs and never stored; each
/// call returns a new timestamp and hash.
#[utoipa::path(
    get,
    path = "/api/verify/challenge",
    tag = "Verification",
    params(ChallengeQuery),
    responses(
        (status = 200, description = "Challenge to publish", body = ChallengeResponse),
        (status = 401, description = "No valid session"),
    )
)]
pub async fn get_challenge(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
    headers: HeaderMap,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let mut ctx = RequestContext::new(headers, Bytes::new());
    Chain::new().guard(RequireAuth).run(&mut ctx, &state).await?;
    let sub = ctx.session()?.sub.clone();

    let owner_id = {
        let store = state.store.read().await;
        store
            .account_by_name(&sub)
            .map(|account| account.id)
            .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_USER))?
    };

    let challenge = verification::challenge_now(
        &state.config.verification_secret,
        owner_id,
        query.network,
        &query.external_name,
    );
    let url = verification::challenge_url(&state.config.public_base_url, &sub, &challenge);
    Ok(Json(ChallengeResponse {
        proof_hash: challenge.proof_hash,
        issued_at_ms: challenge.issued_at_ms,
        url,
        placement: query.network.placement(),
    }))
}

/// Submit a published proof for manual review.
///
/// Moves the identity to `PENDING` when it was `UNVERIFIED` or `REJECTED`;
/// otherwise succeeds without changing anything.
#[utoipa::path(
    post,
    path = "/api/verify",
    tag = "Verification",
    request_body = VerifySubmitRequest,
    responses(
        (status = 200, description = "Current identity status", body = StatusResponse),
        (status = 400, description = "UNKNOWN_IDENTITY"),
    )
)]
pub async fn submit_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .guard(ValidateBody::<VerifySubmitRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let sub = ctx.session()?.sub.clone();
    let request: VerifySubmitRequest = ctx.take_body()?;

    let mut store = state.store.write().await;
    let owner_id = store
        .account_by_name(&sub)
        .map(|account| account.id)
        .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_USER))?;

    verification::submit(
        &mut store,
        owner_id,
        request.network,
        &request.external_name,
        request.timestamp_ms,
        request.proof,
    )
    .map_err(|err| match err {
        StoreError::UnknownIdentity => ApiError::bad_request(codes::UNKNOWN_IDENTITY),
        other => ApiError::internal(other),
    })?;

    let status = store
        .identity_by_handle(owner_id, request.network, &request.external_name)
        .map(|identity| identity.status)
        .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_IDENTITY))?;
    Ok(Json(StatusResponse { status }))
}

/// Apply a reviewer decision to a pending identity.
///
/// Only the account configured as `REVIEWER_USER` may call this. The
/// reviewer inspects the published proof by hand; nothing here fetches the
/// external platform.
#[utoipa::path(
    post,
    path = "/api/verify/review",
    tag = "Verification",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "New identity status", body = StatusResponse),
        (status = 400, description = "NOT_PENDING or UNKNOWN_IDENTITY"),
        (status = 401, description = "REVIEW_FORBIDDEN"),
    )
)]
pub async fn review_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .guard(ValidateBody::<ReviewRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let sub = ctx.session()?.sub.clone();
    let request: ReviewRequest = ctx.take_body()?;

    if state.config.reviewer.as_deref() != Some(sub.as_str()) {
        return Err(ApiError::unauthorized(codes::REVIEW_FORBIDDEN));
    }

    let mut store = state.store.write().await;
    let status = verification::review(&mut store, request.network, request.id, request.approve)
        .map_err(|err| match err {
            ReviewError::UnknownIdentity => ApiError::bad_request(codes::UNKNOWN_IDENTITY),
            ReviewError::NotPending => ApiError::bad_request(codes::NOT_PENDING),
        })?;
    Ok(Json(StatusResponse { status }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{csrf, session};
    use crate::models::{IdentityStatus, Network};
    use axum::http::{header::COOKIE, HeaderValue, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    async fn setup() -> (AppState, Uuid, Uuid) {
        let state = AppState::for_tests();
        let (owner, identity) = {
            let mut store = state.store.write().await;
            let account = store
                .create_account("alice", "alice@example.com", "hash")
                .unwrap();
            // The test config names "reviewer" as REVIEWER_USER.
            store
                .create_account("reviewer", "review@example.com", "hash")
                .unwrap();
            let identity =
                store.create_identity(account.id, Network::Twitter, None, "alice_tw", "");
            (account.id, identity.id)
        };
        (state, owner, identity)
    }

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

    fn submit_body() -> Bytes {
        Bytes::from(
            json!({
                "network": "twitter",
                "externalName": "alice_tw",
                "timestampMs": 1_700_000_000_000i64,
                "proof": {"postUrl": "https://twitter.example/alice_tw/status/1"},
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn challenge_regenerates_per_call() {
        let (state, _, _) = setup().await;
        let headers = authed_headers(&state, "alice", "alice@example.com");
        let query = ChallengeQuery {
            network: Network::Twitch,
            external_name: "alice_tv".to_string(),
        };
        let Json(first) = get_challenge(State(state.clone()), Query(query), headers)
            .await
            .expect("challenge");
        assert_eq!(first.proof_hash.len(), 16);
        assert!(first.url.contains(&first.proof_hash));
        assert_eq!(
            first.placement,
            crate::models::ProofPlacement::ProfileField
        );
    }

    #[tokio::test]
    async fn submit_flips_status_to_pending() {
        let (state, owner, _) = setup().await;
        let headers = authed_headers(&state, "alice", "alice@example.com");
        let Json(response) = submit_verification(State(state.clone()), headers, submit_body())
            .await
            .expect("submit succeeds");
        assert_eq!(response.status, IdentityStatus::Pending);

        let store = state.store.read().await;
        assert_eq!(store.verification_requests().len(), 1);
        assert_eq!(store.verification_requests()[0].user_id, owner);
    }

    #[tokio::test]
    async fn submit_twice_is_a_noop_success() {
        let (state, _, _) = setup().await;
        let headers = authed_headers(&state, "alice", "alice@example.com");
        submit_verification(State(state.clone()), headers, submit_body())
            .await
            .unwrap();

        let headers = authed_headers(&state, "alice", "alice@example.com");
        let Json(response) = submit_verification(State(state.clone()), headers, submit_body())
            .await
            .expect("second submit still succeeds");
        assert_eq!(response.status, IdentityStatus::Pending);

        let store = state.store.read().await;
        assert_eq!(store.verification_requests().len(), 1);
    }

    #[tokio::test]
    async fn review_requires_configured_reviewer() {
        let (state, _, id) = setup().await;
        let headers = authed_headers(&state, "alice", "alice@example.com");
        submit_verification(State(state.clone()), headers, submit_body())
            .await
            .unwrap();

        let body = Bytes::from(
            json!({"network": "twitter", "id": id, "approve": true}).to_string(),
        );
        let headers = authed_headers(&state, "alice", "alice@example.com");
        let err = review_verification(State(state.clone()), headers, body.clone())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body["error"], codes::REVIEW_FORBIDDEN);

        let headers = authed_headers(&state, "reviewer", "review@example.com");
        let Json(response) = review_verification(State(state.clone()), headers, body)
            .await
            .expect("reviewer may approve");
        assert_eq!(response.status, IdentityStatus::Verified);
    }

    #[tokio::test]
    async fn review_of_unverified_identity_is_not_pending() {
        let (state, _, id) = setup().await;
        let body = Bytes::from(
            json!({"network": "twitter", "id": id, "approve": false}).to_string(),
        );
        let headers = authed_headers(&state, "reviewer", "review@example.com");
        let err = review_verification(State(state.clone()), headers, body)
            .await
            .unwrap_err();
        assert_eq!(err.body["error"], codes::NOT_PENDING);
    }
}
