// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Clock, TokenCodec};
use crate::storage::{ClientPageCache, Database};
use crate::tasks::TaskQueue;

/// Number of client listing pages kept in memory.
pub const PAGE_CACHE_CAPACITY: usize = 64;

/// Lifetime of a cached client listing page.
pub const PAGE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenCodec>,
    pub db: Arc<Database>,
    pub clock: Arc<dyn Clock>,
    pub page_cache: Arc<ClientPageCache>,
    pub tasks: TaskQueue,
}

impl AppState {
    pub fn new(tokens: TokenCodec, db: Arc<Database>, clock: Arc<dyn Clock>, tasks: TaskQueue) -> Self {
        Self {
            tokens: Arc::new(tokens),
            db,
            clock,
            page_cache: Arc::new(ClientPageCache::new(PAGE_CACHE_CAPACITY, PAGE_CACHE_TTL)),
            tasks,
        }
    }
}
