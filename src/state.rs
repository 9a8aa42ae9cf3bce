// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 handledir contributors

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{auth::TokenCodec, config::AppConfig, store::InMemoryStore};

/// Shared application state. The config and token codec are immutable after
/// startup; the store is the only mutable cross-request state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<InMemoryStore>>,
    pub config: Arc<AppConfig>,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let codec = TokenCodec::new(&config.session_secret);
        Self {
            store: Arc::new(RwLock::new(InMemoryStore::new())),
            config: Arc::new(config),
            codec: Arc::new(codec),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(AppConfig::for_tests())
    }
}
