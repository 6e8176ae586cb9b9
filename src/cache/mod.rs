// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared compiled-expression cache
//!
//! This module provides a thread-safe cache mapping expression source text to
//! its compiled form, so identical expressions are compiled once no matter how
//! many evaluators or threads use them.
//!
//! Two threads missing on the same new source at the same time may both
//! compile it. The first stored artifact is kept and handed to later
//! callers; the map itself is never corrupted by the race.

pub mod config;

pub use config::CacheConfig;

use dashmap::DashMap;
use log::{debug, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about the compiled-expression cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to compile
    pub misses: u64,
    /// Successful compilations
    pub compilations: u64,
    /// Compilations the engine rejected
    pub compile_failures: u64,
    /// Entries dropped to respect the size limit
    pub evictions: u64,
    /// Number of entries currently cached
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64) / ((self.hits + self.misses) as f64) * 100.0
        }
    }
}

#[derive(Debug)]
struct CacheEntry<C> {
    compiled: Arc<C>,
    last_accessed: AtomicU64,
}

impl<C> CacheEntry<C> {
    fn new(compiled: Arc<C>, tick: u64) -> Self {
        Self {
            compiled,
            last_accessed: AtomicU64::new(tick),
        }
    }

    fn touch(&self, tick: u64) -> Arc<C> {
        self.last_accessed.fetch_max(tick, Ordering::Relaxed);
        Arc::clone(&self.compiled)
    }
}

/// Thread-safe cache of compiled expressions keyed by exact source text
#[derive(Debug)]
pub struct ExpressionCache<C> {
    entries: DashMap<Arc<str>, CacheEntry<C>>,
    config: CacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
    compile_failures: AtomicU64,
    evictions: AtomicU64,
}

impl<C> ExpressionCache<C> {
    /// Create a new unbounded cache
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a new cache with custom configuration
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compilations: AtomicU64::new(0),
            compile_failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up the compiled form of `source` without side effects
    pub fn get(&self, source: &str) -> Option<Arc<C>> {
        self.entries
            .get(source)
            .map(|entry| Arc::clone(&entry.compiled))
    }

    /// Store a compiled form for `source`, replacing any previous one
    pub fn put(&self, source: &str, compiled: C) {
        if !self.entries.contains_key(source) {
            self.evict_if_full();
        }
        let entry = CacheEntry::new(Arc::new(compiled), self.tick());
        self.entries.insert(Arc::from(source), entry);
    }

    /// Get the compiled form of `source`, compiling it on first use.
    ///
    /// `compile` runs without any lock held. Failures are returned unchanged
    /// and leave the cache untouched.
    pub fn get_or_compile<E, F>(&self, source: &str, compile: F) -> Result<Arc<C>, E>
    where
        F: FnOnce(&str) -> Result<C, E>,
    {
        if let Some(entry) = self.entries.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("expression cache hit: {source:?}");
            return Ok(entry.touch(self.tick()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = match compile(source) {
            Ok(compiled) => Arc::new(compiled),
            Err(err) => {
                self.compile_failures.fetch_add(1, Ordering::Relaxed);
                debug!("expression failed to compile: {source:?}");
                return Err(err);
            }
        };
        self.compilations.fetch_add(1, Ordering::Relaxed);
        debug!("compiled expression: {source:?}");

        if !self.entries.contains_key(source) {
            self.evict_if_full();
        }
        let tick = self.tick();
        let stored = self
            .entries
            .entry(Arc::from(source))
            .or_insert_with(|| CacheEntry::new(compiled, tick));
        Ok(Arc::clone(&stored.compiled))
    }

    /// Check whether `source` currently has a cached compiled form
    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    /// Drop the entry for `source`, returning its compiled form
    pub fn remove(&self, source: &str) -> Option<Arc<C>> {
        self.entries.remove(source).map(|(_, entry)| entry.compiled)
    }

    /// Number of cached expressions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no expressions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
            compile_failures: self.compile_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Evict least recently used entries when the cache is full.
    ///
    /// Must not be called while holding a guard into `entries`.
    fn evict_if_full(&self) {
        let Some(max_entries) = self.config.max_entries else {
            return;
        };
        if self.entries.len() < max_entries {
            return;
        }

        let mut by_age: Vec<(Arc<str>, u64)> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    Arc::clone(entry.key()),
                    entry.value().last_accessed.load(Ordering::Relaxed),
                )
            })
            .collect();
        by_age.sort_by_key(|(_, last_accessed)| *last_accessed);

        let mut removed = 0u64;
        for (key, _) in by_age.into_iter().take(self.config.eviction_batch()) {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        debug!("evicted {removed} compiled expressions");
    }
}

impl<C> Default for ExpressionCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn compile_len(source: &str) -> Result<usize, String> {
        Ok(source.len())
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache: ExpressionCache<usize> = ExpressionCache::new();

        assert!(cache.get("#target").is_none());
        cache.put("#target", 7);
        assert_eq!(cache.get("#target").as_deref(), Some(&7));

        // put overwrites
        cache.put("#target", 8);
        assert_eq!(cache.get("#target").as_deref(), Some(&8));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_has_no_side_effects() {
        let cache: ExpressionCache<usize> = ExpressionCache::new();
        cache.put("a", 1);
        cache.get("a");
        cache.get("missing");
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_get_or_compile_compiles_once() {
        let cache: ExpressionCache<usize> = ExpressionCache::new();
        let calls = Cell::new(0);
        for _ in 0..5 {
            let compiled = cache
                .get_or_compile("#target + 10", |s| {
                    calls.set(calls.get() + 1);
                    compile_len(s)
                })
                .unwrap();
            assert_eq!(*compiled, 12);
        }
        assert_eq!(calls.get(), 1);

        let stats = cache.stats();
        assert_eq!(stats.compilations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.hit_rate(), 80.0);
    }

    #[test]
    fn test_failed_compilation_not_cached() {
        let cache: ExpressionCache<usize> = ExpressionCache::new();
        let result = cache.get_or_compile("((", |_| Err::<usize, _>("unbalanced".to_string()));
        assert_eq!(result.unwrap_err(), "unbalanced");
        assert!(!cache.contains("(("));
        assert_eq!(cache.stats().compile_failures, 1);

        // unrelated expressions are unaffected
        assert!(cache.get_or_compile("ok", compile_len).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_exact_text() {
        let cache: ExpressionCache<usize> = ExpressionCache::new();
        cache.get_or_compile("#target+1", compile_len).unwrap();
        cache.get_or_compile("#target + 1", compile_len).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_eviction() {
        let cache: ExpressionCache<usize> = ExpressionCache::with_config(CacheConfig::bounded(5));

        for i in 0..10 {
            let expr = format!("#target + {i}");
            cache.get_or_compile(&expr, compile_len).unwrap();
        }

        let stats = cache.stats();
        assert!(stats.entries <= 5);
        assert!(stats.evictions > 0);
    }

    #[test]
    fn test_eviction_prefers_least_recently_used() {
        let cache: ExpressionCache<usize> =
            ExpressionCache::with_config(CacheConfig::bounded(3).with_eviction_ratio(0.3));

        cache.get_or_compile("a", compile_len).unwrap();
        cache.get_or_compile("b", compile_len).unwrap();
        cache.get_or_compile("c", compile_len).unwrap();
        // refresh "a" so "b" becomes the oldest
        cache.get_or_compile("a", compile_len).unwrap();
        cache.get_or_compile("d", compile_len).unwrap();

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn test_eviction_keeps_live_references_valid() {
        let cache: ExpressionCache<String> = ExpressionCache::with_config(CacheConfig::bounded(1));
        let held = cache
            .get_or_compile("first", |s| Ok::<_, ()>(s.to_uppercase()))
            .unwrap();
        cache
            .get_or_compile("second", |s| Ok::<_, ()>(s.to_uppercase()))
            .unwrap();

        assert!(!cache.contains("first"));
        assert_eq!(held.as_str(), "FIRST");
    }

    #[test]
    fn test_remove_and_clear() {
        let cache: ExpressionCache<usize> = ExpressionCache::new();
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.remove("a").as_deref(), Some(&1));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
