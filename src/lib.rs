// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

//! handledir - Social Handle Directory Service
//!
//! This crate provides a directory where people register the handles they
//! hold on social platforms and prove ownership through published
//! challenges. All state-changing traffic passes a cookie-based session
//! and double-submit CSRF layer.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session cookies, CSRF tokens, password hashing
//! - `pipeline` - Per-request guard chain
//! - `verification` - Ownership challenge protocol
//! - `store` - In-memory persistence

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod store;
pub mod verification;
