// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for rendered client listing pages.
//!
//! Projections depend on the as-of date, so the date is part of the key.
//! Any client creation clears the whole cache and advances its generation;
//! a page read from storage before a clear is never stored after it.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use lru::LruCache;

use crate::models::ClientPage;

/// `(as_of_date, page, size)`. The unpaginated listing uses `(date, None)`.
pub type PageKey = (NaiveDate, Option<(u64, u64)>);

struct CacheEntry {
    page: ClientPage,
    inserted_at: Instant,
}

struct Pages {
    entries: LruCache<PageKey, CacheEntry>,
    generation: u64,
}

/// In-process LRU cache for client listings.
pub struct ClientPageCache {
    cache: Mutex<Pages>,
    ttl: Duration,
}

impl ClientPageCache {
    /// - `capacity`: Max number of pages to keep.
    /// - `ttl`: Time-to-live for each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(Pages {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                generation: 0,
            }),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, key: &PageKey) -> Option<ClientPage> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.page.clone());
            }
            cache.entries.pop(key);
        }
        None
    }

    /// Current generation. Capture it before reading the rows a page is
    /// built from and hand it back to [`put`](Self::put).
    pub fn generation(&self) -> u64 {
        self.cache.lock().map(|c| c.generation).unwrap_or(u64::MAX)
    }

    /// Store `page` unless the cache was cleared since `generation` was read.
    pub fn put(&self, key: PageKey, page: ClientPage, generation: u64) {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.generation != generation {
                return;
            }
            cache.entries.put(
                key,
                CacheEntry {
                    page,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every cached page.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.entries.clear();
            cache.generation = cache.generation.wrapping_add(1);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
