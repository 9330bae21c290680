//! Storage for registrations and singleton instances
//!
//! Registrations live in an insertion-ordered map so validation and error
//! reports are deterministic. Singletons live in a `DashMap` of
//! construct-once cells.

use crate::{Instance, Key, Registration, Result};
use ahash::{AHashMap, RandomState};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Registration map keyed by normalized [`Key`], remembering first-insertion order
#[derive(Clone, Default)]
pub(crate) struct Registry {
    entries: AHashMap<Key, Registration>,
    order: Vec<Key>,
}

impl Registry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: AHashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    /// Insert a registration, returning the one it replaced.
    ///
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, registration: Registration) -> Option<Registration> {
        let key = registration.key().clone();
        let previous = self.entries.insert(key.clone(), registration);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    #[inline]
    pub fn get(&self, key: &Key) -> Option<&Registration> {
        self.entries.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Registrations in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Registration> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// Keys in registration order
    pub fn keys(&self) -> &[Key] {
        &self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.len())
            .finish()
    }
}

/// A base registry seen through an optional override layer
#[derive(Clone, Copy)]
pub(crate) struct RegistryView<'a> {
    base: &'a Registry,
    overrides: &'a Registry,
}

impl<'a> RegistryView<'a> {
    #[inline]
    pub fn new(base: &'a Registry, overrides: &'a Registry) -> Self {
        Self { base, overrides }
    }

    /// Overrides shadow the base registration for the same key
    #[inline]
    pub fn get(&self, key: &Key) -> Option<&'a Registration> {
        self.overrides.get(key).or_else(|| self.base.get(key))
    }

    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.overrides.contains(key) || self.base.contains(key)
    }

    /// Effective registrations: base order first, then override-only keys
    pub fn iter(&self) -> impl Iterator<Item = &'a Registration> + 'a {
        let (base, overrides) = (self.base, self.overrides);
        base.iter()
            .map(move |registration| overrides.get(registration.key()).unwrap_or(registration))
            .chain(overrides.iter().filter(move |r| !base.contains(r.key())))
    }

    pub fn keys(&self) -> Vec<Key> {
        self.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.base.len()
            + self
                .overrides
                .keys()
                .iter()
                .filter(|key| !self.base.contains(key))
                .count()
    }
}

/// Thread-safe singleton instance cache.
///
/// Each key owns a `OnceCell`; the map's shard lock is only held while the
/// cell is fetched, so factories run without it and may resolve further keys.
/// Concurrent first resolutions of one key block on the cell and observe a
/// single construction.
pub(crate) struct SingletonCache {
    cells: DashMap<Key, Arc<OnceCell<Instance>>, RandomState>,
}

impl SingletonCache {
    /// Create an empty cache with a small shard count.
    ///
    /// Containers typically hold a few dozen singletons, far below DashMap's
    /// default of `num_cpus * 4` shards.
    #[inline]
    pub fn new() -> Self {
        Self {
            cells: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Cached instance, if constructed already
    #[inline]
    pub fn get(&self, key: &Key) -> Option<Instance> {
        self.cells
            .get(key)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    /// Return the cached instance or construct it exactly once.
    ///
    /// A failed construction leaves the cell empty.
    pub fn get_or_try_init<F>(&self, key: &Key, init: F) -> Result<Instance>
    where
        F: FnOnce() -> Result<Instance>,
    {
        if let Some(instance) = self.get(key) {
            #[cfg(feature = "logging")]
            trace!(target: "keyed_injector", service = %key, "Singleton cache hit");
            return Ok(instance);
        }

        let cell = Arc::clone(
            self.cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );
        cell.get_or_try_init(init).map(Arc::clone)
    }

    /// Number of constructed singletons
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.get().is_some()).count()
    }
}

impl Default for SingletonCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SingletonCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonCache")
            .field("constructed", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiError, Factory, Kwargs, Lifetime};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn registration(key: &str, value: u32) -> Registration {
        Registration::new(key, Factory::value(value), Lifetime::Singleton, Kwargs::new()).unwrap()
    }

    #[test]
    fn test_registry_keeps_first_position_on_overwrite() {
        let mut registry = Registry::new();
        assert!(registry.insert(registration("a", 1)).is_none());
        assert!(registry.insert(registration("b", 2)).is_none());
        assert!(registry.insert(registration("a", 3)).is_some());

        assert_eq!(registry.keys(), &[Key::literal("a"), Key::literal("b")]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_view_prefers_overrides() {
        let mut base = Registry::new();
        base.insert(registration("a", 1));
        base.insert(registration("b", 2));

        let mut overrides = Registry::new();
        overrides.insert(registration("b", 20));

        let view = RegistryView::new(&base, &overrides);
        assert_eq!(view.len(), 2);
        assert_eq!(view.keys(), vec![Key::literal("a"), Key::literal("b")]);

        let effective = view.get(&Key::literal("b")).unwrap();
        assert!(std::ptr::eq(effective, overrides.get(&Key::literal("b")).unwrap()));
        assert!(view.contains(&Key::literal("a")));
        assert!(!view.contains(&Key::literal("c")));
    }

    #[test]
    fn test_cache_constructs_once() {
        let cache = SingletonCache::new();
        let key = Key::literal("svc");
        let calls = AtomicU32::new(0);

        let make = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(7u32) as Instance)
        };

        let a = cache.get_or_try_init(&key, make).unwrap();
        let b = cache.get_or_try_init(&key, make).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_does_not_keep_failures() {
        let cache = SingletonCache::new();
        let key = Key::literal("flaky");

        let failed = cache.get_or_try_init(&key, || Err(DiError::creation_failed::<u32>("boom")));
        assert!(failed.is_err());
        assert!(cache.get(&key).is_none());

        let value = cache.get_or_try_init(&key, || Ok(Arc::new(1u32) as Instance));
        assert!(value.is_ok());
        assert_eq!(cache.len(), 1);
    }
}
