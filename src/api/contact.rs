// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! Public contact form. CSRF-protected but requires no session, which is
//! exactly why the CSRF token is not tied to authentication.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    error::ApiError,
    models::{ContactMessage, ContactRequest},
    pipeline::{Chain, RequestContext, RequireCsrf, ValidateBody},
    state::AppState,
};

/// Store a contact message. The reply email is optional and stored as null
/// when absent.
#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "Contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored", body = ContactMessage),
        (status = 400, description = "CSRF or body validation failure"),
    )
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ContactMessage>), ApiError> {
    let mut ctx = RequestContext::new(headers, body);
    Chain::new()
        .guard(RequireCsrf)
        .guard(ValidateBody::<ContactRequest>::new())
        .run(&mut ctx, &state)
        .await?;
    let request: ContactRequest = ctx.take_body()?;

    let mut store = state.store.write().await;
    let record = store.push_contact_message(request.email, request.message);
    Ok((StatusCode::CREATED, Json(record)))
}
