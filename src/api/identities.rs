// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Identity endpoints: claim, edit, and remove external platform handles.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{codes, ApiError},
    models::{CreateIdentityRequest, Identity, Network, UpdateIdentityRequest},
    pipeline::{Chain, RequestContext, RequireAuth, RequireCsrf, ValidateBody},
    state::AppState,
};

/// Resolve the session subject to an account id, and check it owns the
/// identity when one is given.
async fn owned_identity(
    state: &AppState,
    sub: &str,
    network: Network,
    id: Uuid,
) -> Result<Identity, ApiError> {
    let store = state.store.read().await;
    let account = store
        .account_by_name(sub)
        .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_USER))?;
    let identity = store
        .identity(network, id)
        .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_IDENTITY))?;
    if identity.owner_user_id != account.id {
        return Err(ApiError::unauthorized(codes::NOT_OWNER));
    }
    Ok(identity.clone())
}

/// Claim a new identity. It starts `UNVERIFIED`.
#[utoipa::path(
    post,
    path = "/api/identities",
    tag = "Identities",
    request_body = CreateIdentityRequest,
    responses(
        (status = 200, description = "Identity created", body = Identity),
        (status = 401, description = "No valid session"),
    )
)]
pub async fn create_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Identity>, ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .guard(ValidateBody::<CreateIdentityRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let sub = ctx.session()?.sub.clone();
    let request: CreateIdentityRequest = ctx.take_body()?;

    let mut store = state.store.write().await;
    let owner_id = store
        .account_by_name(&sub)
        .map(|account| account.id)
        .ok_or_else(|| ApiError::bad_request(codes::UNKNOWN_USER))?;
    let identity = store.create_identity(
        owner_id,
        request.network,
        request.platform_label,
        request.external_name,
        request.description,
    );
    Ok(Json(identity))
}

/// Edit an identity's description. Owner only.
#[utoipa::path(
    patch,
    path = "/api/identities/{network}/{id}",
    tag = "Identities",
    request_body = UpdateIdentityRequest,
    responses(
        (status = 200, description = "Identity updated", body = Identity),
        (status = 400, description = "UNKNOWN_IDENTITY"),
        (status = 401, description = "NOT_OWNER"),
    )
)]
pub async fn update_identity(
    State(state): State<AppState>,
    Path((network, id)): Path<(Network, Uuid)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Identity>, ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .guard(ValidateBody::<UpdateIdentityRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let sub = ctx.session()?.sub.clone();
    let request: UpdateIdentityRequest = ctx.take_body()?;

    owned_identity(&state, &sub, network, id).await?;
    let mut store = state.store.write().await;
    let updated = store
        .update_identity_description(id, request.description)
        .map_err(|_| ApiError::bad_request(codes::UNKNOWN_IDENTITY))?;
    Ok(Json(updated))
}

/// Remove an identity. Owner only.
#[utoipa::path(
    delete,
    path = "/api/identities/{network}/{id}",
    tag = "Identities",
    request_body = (),
    responses(
        (status = 200, description = "Identity deleted"),
        (status = 400, description = "UNKNOWN_IDENTITY"),
        (status = 401, description = "NOT_OWNER"),
    )
)]
pub async fn delete_identity(
    State(state): State<AppState>,
    Path((network, id)): Path<(Network, Uuid)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(), ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireAuth)
        .guard(RequireCsrf)
        .run(&mut ctx, &state)
        .await?;
    let sub = ctx.session()?.sub.clone();

    owned_identity(&state, &sub, network, id).await?;
    let mut store = state.store.write().await;
    store
        .delete_identity(network, id)
        .map_err(|_| ApiError::bad_request(codes::UNKNOWN_IDENTITY))?;
    Ok(())
}
