use bytes::Bytes;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct CachedPage {
    pub body: Bytes,
    pub etag: String,
    pub tags: BTreeSet<String>,
    pub created_at: Instant,
}

impl CachedPage {
    #[must_use]
    pub fn new(body: Bytes, tags: impl IntoIterator<Item = String>) -> Self {
        let etag = format!("\"{}\"", ridgeline_core::short_hash(&body, 16));
        Self {
            body,
            etag,
            tags: tags.into_iter().collect(),
            created_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageCacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub invalidated: u64,
}

/// Rendered public pages keyed by request path.
///
/// Every invalidation bumps `generation`. A render that started before the
/// bump may have read old content, so [`PageCache::insert_if_current`]
/// refuses it.
pub struct PageCache {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, CachedPage>,
    generation: u64,
    hits: u64,
    misses: u64,
    invalidated: u64,
}

fn cache_key(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
            generation: 0,
            hits: 0,
            misses: 0,
            invalidated: 0,
        }
    }

    fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, v| v.created_at.elapsed() <= ttl);
    }

    pub fn get(&mut self, path: &str) -> Option<CachedPage> {
        self.purge_expired();
        let found = self.entries.get(cache_key(path)).cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, path: &str, page: CachedPage) {
        self.purge_expired();
        let key = cache_key(path).to_string();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, v)| v.created_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(key, page);
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Insert unless something was invalidated since `generation` was read.
    pub fn insert_if_current(&mut self, path: &str, page: CachedPage, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.insert(path, page);
        true
    }

    /// Returns how many entries were dropped.
    pub fn invalidate_paths(&mut self, paths: &[String]) -> usize {
        let mut removed = 0;
        for path in paths {
            if self.entries.remove(cache_key(path)).is_some() {
                removed += 1;
            }
        }
        self.generation += 1;
        self.invalidated += removed as u64;
        removed
    }

    pub fn invalidate_tags(&mut self, tags: &[String]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, v| !tags.iter().any(|t| v.tags.contains(t)));
        let removed = before - self.entries.len();
        self.generation += 1;
        self.invalidated += removed as u64;
        removed
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.generation += 1;
        self.invalidated += removed as u64;
        removed
    }

    #[must_use]
    pub fn stats(&self) -> PageCacheStats {
        PageCacheStats {
            entries: self.entries.len(),
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
            hits: self.hits,
            misses: self.misses,
            invalidated: self.invalidated,
        }
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entries.keys().cloned().collect();
        out.sort();
        out
    }
}
