// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! # Domain and API Data Models
//!
//! This module defines the directory's domain records and the request and
//! response structures used by the REST API. API-facing types derive
//! `Serialize`/`Deserialize` with camelCase field names (the wire contract
//! consumed by the React front end) and `ToSchema` for OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Accounts**: directory users, looked up by unique name and email
//! - **Identities**: claimed handles on external platforms, with a
//!   verification status lifecycle
//! - **Verification**: persisted proof submissions awaiting manual review
//! - **Contact**: messages from the public contact form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::pipeline::BodySchema;

// =============================================================================
// Networks
// =============================================================================

/// An external platform a user can claim an identity on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Twitch,
    Twitter,
    Bluesky,
    Mastodon,
    Threads,
    Youtube,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Twitch => "twitch",
            Network::Twitter => "twitter",
            Network::Bluesky => "bluesky",
            Network::Mastodon => "mastodon",
            Network::Threads => "threads",
            Network::Youtube => "youtube",
        }
    }

    /// Where the ownership proof must be published on this platform.
    ///
    /// Platforms with discrete, dated posts take the proof in a post;
    /// platforms that only offer persistent profile text take it in the
    /// profile/bio field.
    pub fn placement(self) -> ProofPlacement {
        match self {
            Network::Twitter | Network::Bluesky | Network::Mastodon | Network::Threads => {
                ProofPlacement::DatedPost
            }
            Network::Twitch | Network::Youtube => ProofPlacement::ProfileField,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a proof is published on the external platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ProofPlacement {
    DatedPost,
    ProfileField,
}

// =============================================================================
// Accounts
// =============================================================================

/// A directory account. Internal record, never serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    /// Unique display name; also the session subject.
    pub name: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Identities
// =============================================================================

/// Verification lifecycle of an identity.
///
/// `Unverified --submit--> Pending --approve--> Verified`;
/// `Pending --reject--> Rejected --submit--> Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentityStatus {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

/// A claimed handle on an external platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    /// Account that claims this identity.
    pub owner_user_id: Uuid,
    pub network: Network,
    /// Optional display label, e.g. a channel or instance name.
    pub platform_label: Option<String>,
    /// The handle on the external platform.
    pub external_name: String,
    pub description: String,
    pub status: IdentityStatus,
}

/// A persisted proof submission awaiting manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub user_id: Uuid,
    pub network: Network,
    pub external_name: String,
    pub requested_at: DateTime<Utc>,
    /// The claimed proof payload, recorded as-is for the reviewer.
    pub proof: serde_json::Value,
}

// =============================================================================
// Contact
// =============================================================================

/// A message submitted through the public contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    /// Optional reply address; null for anonymous submissions.
    pub email: Option<String>,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

// =============================================================================
// Request bodies
// =============================================================================
//
// Each body type lists its wire-level property names for the ValidateBody
// guard, which rejects unknown properties before deserialization.

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl BodySchema for LoginRequest {
    const PROPERTIES: &'static [&'static str] = &["email", "password"];
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl BodySchema for RegisterRequest {
    const PROPERTIES: &'static [&'static str] = &["name", "email", "password"];
}

/// Profile update. The current password is always required; the `new*`
/// fields are applied only when present.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub password: String,
    pub new_name: Option<String>,
    pub new_email: Option<String>,
    pub new_password: Option<String>,
}

impl BodySchema for UpdateUserRequest {
    const PROPERTIES: &'static [&'static str] =
        &["password", "newName", "newEmail", "newPassword"];
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentityRequest {
    pub network: Network,
    pub platform_label: Option<String>,
    pub external_name: String,
    #[serde(default)]
    pub description: String,
}

impl BodySchema for CreateIdentityRequest {
    const PROPERTIES: &'static [&'static str] =
        &["network", "platformLabel", "externalName", "description"];
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdentityRequest {
    pub description: String,
}

impl BodySchema for UpdateIdentityRequest {
    const PROPERTIES: &'static [&'static str] = &["description"];
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubmitRequest {
    pub network: Network,
    pub external_name: String,
    /// Challenge timestamp the proof was generated with.
    pub timestamp_ms: i64,
    /// The claimed proof payload (e.g. post URL and displayed hash).
    pub proof: serde_json::Value,
}

impl BodySchema for VerifySubmitRequest {
    const PROPERTIES: &'static [&'static str] =
        &["network", "externalName", "timestampMs", "proof"];
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub network: Network,
    pub id: Uuid,
    pub approve: bool,
}

impl BodySchema for ReviewRequest {
    const PROPERTIES: &'static [&'static str] = &["network", "id", "approve"];
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub message: String,
    pub email: Option<String>,
}

impl BodySchema for ContactRequest {
    const PROPERTIES: &'static [&'static str] = &["message", "email"];
}

// =============================================================================
// Response bodies
// =============================================================================

/// Returned by login, registration, and profile updates.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub name: String,
    pub email: String,
}

/// A freshly generated verification challenge for the front end to render.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// Truncated keyed digest the user must publish.
    pub proof_hash: String,
    pub issued_at_ms: i64,
    /// Proof URL embedding the hash, ready to paste.
    pub url: String,
    pub placement: ProofPlacement,
}

/// Identity status after a verification-protocol operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: IdentityStatus,
}

/// Query parameters for challenge generation.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuery {
    pub network: Network,
    pub external_name: String,
}
