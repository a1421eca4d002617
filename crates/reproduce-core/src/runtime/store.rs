// crates/reproduce-core/src/runtime/store.rs
// ============================================================================
// Module: Reproduce In-Memory Cache Store
// Description: Volatile cache store and shared store handle.
// Purpose: Provide a deterministic store for tests and ephemeral runs.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryCacheStore`] keeps entries in a mutex-protected map and never
//! persists them. [`SharedCacheStore`] is the clonable handle the engine and
//! the batch runner share; it wraps any [`CacheStore`] implementation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::CacheEntry;
use crate::interfaces::CacheStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory cache store for tests and ephemeral runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCacheStore {
    /// Entry map protected by a mutex.
    entries: Arc<Mutex<BTreeMap<String, CacheEntry>>>,
}

impl InMemoryCacheStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns a copy of every entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn snapshot(&self) -> Result<BTreeMap<String, CacheEntry>, StoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Store("cache store mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, spec: &str) -> Result<Option<CacheEntry>, StoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Store("cache store mutex poisoned".to_string()))?;
        Ok(guard.get(spec).cloned())
    }

    fn put(&self, spec: &str, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Store("cache store mutex poisoned".to_string()))?
            .insert(spec.to_string(), entry);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared cache store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedCacheStore {
    /// Inner store implementation.
    inner: Arc<dyn CacheStore + Send + Sync>,
}

impl SharedCacheStore {
    /// Wraps a cache store in a shared, clonable handle.
    #[must_use]
    pub fn from_store(store: impl CacheStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn CacheStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl CacheStore for SharedCacheStore {
    fn get(&self, spec: &str) -> Result<Option<CacheEntry>, StoreError> {
        self.inner.get(spec)
    }

    fn contains(&self, spec: &str) -> Result<bool, StoreError> {
        self.inner.contains(spec)
    }

    fn put(&self, spec: &str, entry: CacheEntry) -> Result<(), StoreError> {
        self.inner.put(spec, entry)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush()
    }

    fn has_materialized_source(&self, source_spec: &str, work_dir: &Path) -> Result<bool, StoreError> {
        self.inner.has_materialized_source(source_spec, work_dir)
    }
}
