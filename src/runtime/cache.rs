//! Per-context program cache
//!
//! Maps an algorithm identifier to a compiled program. One cache lives in
//! each context (shared by clones of the context handle), so entries persist
//! for exactly the lifetime of the context and are never evicted.
//!
//! # Thread Safety
//!
//! Each key owns a slot guarded by its own mutex. The map lock is held only
//! long enough to find or create the slot; the build then runs under the
//! slot lock, so concurrent `get_or_build` calls for the same key run the
//! builder once and every caller receives the same `Arc`. Builds for
//! different keys proceed in parallel. A failed build leaves the slot empty.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

type Slot<P> = Arc<Mutex<Option<Arc<P>>>>;

/// Cache for compiled programs keyed by algorithm identifier
pub struct ProgramCache<P> {
    slots: Mutex<HashMap<&'static str, Slot<P>>>,
}

impl<P> Default for ProgramCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for ProgramCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl<P> ProgramCache<P> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &'static str) -> Slot<P> {
        self.slots.lock().entry(key).or_default().clone()
    }

    /// Look up a committed program
    pub fn get(&self, key: &str) -> Option<Arc<P>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let program = slot.lock().clone();
        program
    }

    /// Insert a program unless one is already committed
    ///
    /// First writer wins: the returned `Arc` is whichever program ends up
    /// cached under `key`.
    pub fn insert(&self, key: &'static str, program: P) -> Arc<P> {
        let slot = self.slot(key);
        let mut guard = slot.lock();
        guard.get_or_insert_with(|| Arc::new(program)).clone()
    }

    /// Get the program cached under `key`, building it on a miss
    ///
    /// `build` runs at most once per successful entry, even under
    /// concurrent calls. Its result is committed only on success.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `build`; the cache is unchanged.
    pub fn get_or_build<F>(&self, key: &'static str, build: F) -> Result<Arc<P>>
    where
        F: FnOnce() -> Result<P>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock();

        if let Some(program) = guard.as_ref() {
            tracing::trace!(key, "program cache hit");
            return Ok(program.clone());
        }

        tracing::debug!(key, "program cache miss, building");
        let program = Arc::new(build()?);
        *guard = Some(program.clone());
        tracing::debug!(key, "program committed to cache");

        Ok(program)
    }

    /// True if a program is committed under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of committed programs
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<P>> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// True if no program is committed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
