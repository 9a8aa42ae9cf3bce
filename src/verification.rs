// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! # Identity Verification Protocol
//!
//! To prove ownership of an external platform account, a user publishes a
//! deterministic, time-bound challenge hash on that platform and then
//! submits the claim here. Submission moves the identity to `PENDING`; a
//! human reviewer looks at the published proof and approves or rejects it.
//!
//! The challenge is a keyed digest over the ordered tuple
//! `{userId, network, externalName, issuedAtMs}` under the process-wide
//! verification secret, truncated for display. It is stateless: regenerated
//! on every render and recomputable at review time from the stored request.
//! Nothing here fetches the external platform; the published proof is
//! checked by a human, deliberately (there is no crawler).

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use url::Url;
use uuid::Uuid;

use crate::models::{IdentityStatus, Network, VerificationRequest};
use crate::store::{InMemoryStore, StoreError};

/// Displayed length of the proof hash, in hex chars.
pub const PROOF_HASH_LEN: usize = 16;

/// A freshly generated ownership challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub proof_hash: String,
    pub issued_at_ms: i64,
}

/// Outcome of a proof submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Status moved to `PENDING` and a verification request was recorded.
    Submitted,
    /// Already `PENDING` or `VERIFIED`; nothing changed.
    Unchanged,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("identity not found")]
    UnknownIdentity,
    #[error("identity is not pending review")]
    NotPending,
}

/// Compute the challenge for an identity at `issued_at_ms`.
///
/// Deterministic over its inputs plus the secret, so no challenge state is
/// ever persisted.
pub fn challenge(
    secret: &str,
    user_id: Uuid,
    network: Network,
    external_name: &str,
    issued_at_ms: i64,
) -> Challenge {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(format!("{user_id}:{network}:{external_name}:{issued_at_ms}").as_bytes());
    let digest = mac.finalize().into_bytes();
    let mut proof_hash = hex::encode(digest);
    proof_hash.truncate(PROOF_HASH_LEN);
    Challenge {
        proof_hash,
        issued_at_ms,
    }
}

/// Compute a challenge issued now.
pub fn challenge_now(
    secret: &str,
    user_id: Uuid,
    network: Network,
    external_name: &str,
) -> Challenge {
    challenge(
        secret,
        user_id,
        network,
        external_name,
        Utc::now().timestamp_millis(),
    )
}

/// The proof URL the user publishes on the external platform.
pub fn challenge_url(base: &Url, subject: &str, challenge: &Challenge) -> String {
    format!(
        "{}/u/{}?proof={}&t={}",
        base.as_str().trim_end_matches('/'),
        subject,
        challenge.proof_hash,
        challenge.issued_at_ms
    )
}

/// Submit an ownership claim for review.
///
/// Legal only from `UNVERIFIED` or `REJECTED`; anything else is a success
/// no-op so the status can neither regress nor loop. Records the claimed
/// proof payload as-is for the reviewer.
pub fn submit(
    store: &mut InMemoryStore,
    owner_user_id: Uuid,
    network: Network,
    external_name: &str,
    timestamp_ms: i64,
    proof: Value,
) -> Result<SubmitOutcome, StoreError> {
    let identity = store
        .identity_by_handle(owner_user_id, network, external_name)
        .ok_or(StoreError::UnknownIdentity)?;

    match identity.status {
        IdentityStatus::Pending | IdentityStatus::Verified => Ok(SubmitOutcome::Unchanged),
        IdentityStatus::Unverified | IdentityStatus::Rejected => {
            let id = identity.id;
            store.push_verification_request(VerificationRequest {
                user_id: owner_user_id,
                network,
                external_name: external_name.to_string(),
                requested_at: Utc::now(),
                proof: serde_json::json!({
                    "proof": proof,
                    "timestampMs": timestamp_ms,
                }),
            });
            store.set_identity_status(id, IdentityStatus::Pending)?;
            Ok(SubmitOutcome::Submitted)
        }
    }
}

/// Apply a reviewer decision. Legal only from `PENDING`.
pub fn review(
    store: &mut InMemoryStore,
    network: Network,
    id: Uuid,
    approve: bool,
) -> Result<IdentityStatus, ReviewError> {
    let identity = store
        .identity(network, id)
        .ok_or(ReviewError::UnknownIdentity)?;
    if identity.status != IdentityStatus::Pending {
        return Err(ReviewError::NotPending);
    }
    let status = if approve {
        IdentityStatus::Verified
    } else {
        IdentityStatus::Rejected
    };
    store
        .set_identity_status(id, status)
        .map_err(|_| ReviewError::UnknownIdentity)?;
    Ok(status)
}
