// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! # Guard Pipeline
//!
//! Cross-cutting request policy (authentication, CSRF, body validation) is
//! expressed as an ordered chain of guards run against a single mutable
//! [`RequestContext`]. The chain short-circuits at the first failing guard,
//! so exactly one terminal response is produced and later guards never see
//! a request an earlier guard rejected.
//!
//! Guards communicate forward through typed slots on the context rather
//! than a dynamically-keyed bag: [`RequireAuth`] publishes the session
//! claim, [`ValidateBody`] publishes the validated body. Ordering matters:
//! auth must run before CSRF wherever subject binding is checked, and body
//! validation before anything that reads the body.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    auth::{csrf, session, SessionClaims},
    error::{codes, ApiError},
    state::AppState,
};

/// Wire-level schema of a request body: the exhaustive list of accepted
/// property names. [`ValidateBody`] rejects anything outside this list.
pub trait BodySchema: DeserializeOwned {
    const PROPERTIES: &'static [&'static str];
}

/// Typed per-request context shared by the guards of one chain run.
pub struct RequestContext {
    headers: HeaderMap,
    raw_body: Bytes,
    /// Path parameter naming the account the request claims to act on.
    subject_param: Option<String>,
    session: Option<SessionClaims>,
    body: Option<Value>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, raw_body: Bytes) -> Self {
        Self {
            headers,
            raw_body,
            subject_param: None,
            session: None,
            body: None,
        }
    }

    /// Attach the path account name for [`RequireSubjectParam`].
    pub fn with_subject_param(mut self, name: impl Into<String>) -> Self {
        self.subject_param = Some(name.into());
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The session claim published by [`RequireAuth`]. Calling this without
    /// having run the guard is a programming error, reported as a 500.
    pub fn session(&self) -> Result<&SessionClaims, ApiError> {
        self.session
            .as_ref()
            .ok_or_else(|| ApiError::internal("session read before RequireAuth ran"))
    }

    /// Deserialize the body validated by [`ValidateBody`].
    pub fn take_body<T: DeserializeOwned>(&mut self) -> Result<T, ApiError> {
        let value = self
            .body
            .take()
            .ok_or_else(|| ApiError::internal("body read before ValidateBody ran"))?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::internal(format!("validated body failed to deserialize: {e}")))
    }
}

pub type GuardFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;

/// A single middleware step. Returning an error terminates the chain.
pub trait Guard: Send + Sync {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext, state: &'a AppState) -> GuardFuture<'a>;
}

/// An ordered guard chain. First failure wins.
#[derive(Default)]
pub struct Chain {
    guards: Vec<Box<dyn Guard>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub async fn run(&self, ctx: &mut RequestContext, state: &AppState) -> Result<(), ApiError> {
        for guard in &self.guards {
            guard.check(ctx, state).await?;
        }
        Ok(())
    }
}

/// Requires a valid session and publishes the claim into the context.
pub struct RequireAuth;

impl Guard for RequireAuth {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext, state: &'a AppState) -> GuardFuture<'a> {
        Box::pin(async move {
            let checked = {
                let store = state.store.read().await;
                session::extract_checked(&ctx.headers, &store, &state.codec)
            };
            match checked {
                Ok(claims) => {
                    ctx.session = Some(claims);
                    Ok(())
                }
                Err(rejection) => {
                    debug!("auth guard rejected request: {}", rejection.error_code());
                    Err(ApiError::unauthorized(rejection.error_code()))
                }
            }
        })
    }
}

/// Validates the double-submit CSRF pair. If [`RequireAuth`] already ran,
/// its claim is used for subject binding; otherwise a best-effort session
/// extraction decides whether binding applies.
pub struct RequireCsrf;

impl Guard for RequireCsrf {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext, state: &'a AppState) -> GuardFuture<'a> {
        Box::pin(async move {
            let session = match &ctx.session {
                Some(claims) => Some(claims.clone()),
                None => {
                    let store = state.store.read().await;
                    session::extract(&ctx.headers, &store, &state.codec)
                }
            };
            csrf::check(&ctx.headers, session.as_ref(), &state.codec).map_err(|rejection| {
                debug!("csrf guard rejected request: {}", rejection.error_code());
                ApiError::bad_request(rejection.error_code())
            })
        })
    }
}

/// Requires the session subject to equal the path account name.
/// Must run after [`RequireAuth`].
pub struct RequireSubjectParam;

impl Guard for RequireSubjectParam {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext, _state: &'a AppState) -> GuardFuture<'a> {
        Box::pin(async move {
            let session = ctx.session()?;
            let param = ctx
                .subject_param
                .as_deref()
                .ok_or_else(|| ApiError::internal("subject param guard without path param"))?;
            if session.sub != param {
                return Err(ApiError::unauthorized(codes::AUTH_PATH_MISMATCH));
            }
            Ok(())
        })
    }
}

/// Parses and schema-checks the JSON body, publishing it into the context.
pub struct ValidateBody<T: BodySchema>(PhantomData<fn() -> T>);

impl<T: BodySchema> ValidateBody<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: BodySchema> Default for ValidateBody<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BodySchema + 'static> Guard for ValidateBody<T> {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext, _state: &'a AppState) -> GuardFuture<'a> {
        Box::pin(async move {
            let value: Value = serde_json::from_slice(&ctx.raw_body)
                .map_err(|_| ApiError::bad_request(codes::BODY_INVALID_JSON))?;
            let object = value
                .as_object()
                .ok_or_else(|| ApiError::bad_request(codes::BODY_INVALID_JSON))?;

            let unexpected: Vec<String> = object
                .keys()
                .filter(|key| !T::PROPERTIES.contains(&key.as_str()))
                .cloned()
                .collect();
            if !unexpected.is_empty() {
                return Err(ApiError::unexpected_properties(unexpected));
            }

            // Full deserialization catches missing and mistyped properties.
            let message = match serde_json::from_value::<T>(value.clone()) {
                Ok(_) => {
                    ctx.body = Some(value);
                    return Ok(());
                }
                Err(e) => e.to_string(),
            };
            let property = backticked_property(&message);
            Err(ApiError::validation(message, property))
        })
    }
}

/// Pull the offending property name out of a serde error message like
/// "missing field `password`", when one is present.
fn backticked_property(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let end = message[start..].find('`')? + start;
    Some(message[start..end].to_string())
}
