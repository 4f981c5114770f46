//! Single-flight object cache for resolved CRS definitions.
//!
//! Concurrent requests for the same code share one resolution: the
//! first caller claims the slot and runs the resolver, later callers
//! block on a latch and receive the shared result. Failures are cached
//! alongside successes so a misbehaving code cannot hammer the backing
//! stores.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crs_common::{AuthorityCode, Crs, CrsError, FactoryError};

type Cached = Result<Arc<Crs>, Arc<CrsError>>;

/// Completion latch for one in-flight resolution.
struct Latch {
    slot: Mutex<Option<Cached>>,
    done: Condvar,
}

impl Latch {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn publish(&self, value: Cached) {
        let mut slot = self.slot.lock();
        *slot = Some(value);
        self.done.notify_all();
    }

    fn wait(&self) -> Cached {
        let mut slot = self.slot.lock();
        while slot.is_none() {
            self.done.wait(&mut slot);
        }
        slot.as_ref().cloned().unwrap_or_else(|| unreachable!())
    }
}

enum SlotState {
    Ready(Cached),
    InFlight(Arc<Latch>),
}

enum Claim {
    /// This caller owns the resolution and must publish to the latch.
    Resolve(Arc<Latch>),
    /// Another caller is resolving; wait on its latch.
    Join(Arc<Latch>),
}

/// Counters snapshot from [`ObjectCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Requests answered from a completed entry.
    pub hits: u64,
    /// Requests that ran the resolver.
    pub misses: u64,
    /// Requests that joined another caller's in-flight resolution.
    pub coalesced: u64,
    /// Completed entries currently cached, successes and failures both.
    pub entries: usize,
}

pub struct ObjectCache {
    slots: DashMap<AuthorityCode, SlotState>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `code`, resolving it with `resolve`
    /// if absent. Exactly one caller runs the resolver per code per
    /// cache generation; the rest share its outcome.
    pub fn get_or_resolve(
        &self,
        code: &AuthorityCode,
        resolve: impl FnOnce() -> Result<Crs, CrsError>,
    ) -> Result<Arc<Crs>, CrsError> {
        // Claim or observe the slot atomically, then release the shard
        // lock before any blocking work.
        let claim = match self.slots.entry(code.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                SlotState::Ready(cached) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Self::unwrap_cached(cached.clone());
                }
                SlotState::InFlight(latch) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    Claim::Join(Arc::clone(latch))
                }
            },
            Entry::Vacant(vacant) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let latch = Arc::new(Latch::new());
                vacant.insert(SlotState::InFlight(Arc::clone(&latch)));
                Claim::Resolve(latch)
            }
        };

        match claim {
            Claim::Resolve(latch) => {
                debug!(code = %code, "resolving");
                // If the resolver unwinds, the guard publishes a failure
                // to any joined waiters and clears the in-flight slot so
                // later callers can retry.
                let mut guard = AbortGuard {
                    cache: self,
                    code,
                    latch: &latch,
                    armed: true,
                };
                let cached: Cached = match resolve() {
                    Ok(crs) => Ok(Arc::new(crs)),
                    Err(err) => Err(Arc::new(err)),
                };
                guard.armed = false;
                // Publish before replacing the slot so waiters parked on
                // the latch never miss the value.
                latch.publish(cached.clone());
                self.slots
                    .insert(code.clone(), SlotState::Ready(cached.clone()));
                Self::unwrap_cached(cached)
            }
            Claim::Join(latch) => Self::unwrap_cached(latch.wait()),
        }
    }

    /// Cached outcome for `code`, if resolution has completed.
    pub fn peek(&self, code: &AuthorityCode) -> Option<Result<Arc<Crs>, CrsError>> {
        let slot = self.slots.get(code)?;
        match slot.value() {
            SlotState::Ready(cached) => Some(Self::unwrap_cached(cached.clone())),
            SlotState::InFlight(_) => None,
        }
    }

    /// Drop all completed entries. In-flight resolutions finish against
    /// their latches and re-insert; callers already waiting are
    /// unaffected.
    pub fn reset(&self) {
        self.slots
            .retain(|_, slot| matches!(slot, SlotState::InFlight(_)));
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.value(), SlotState::Ready(_)))
            .count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            entries,
        }
    }

    fn unwrap_cached(cached: Cached) -> Result<Arc<Crs>, CrsError> {
        match cached {
            Ok(crs) => Ok(crs),
            Err(err) => Err((*err).clone()),
        }
    }
}

/// Unblocks waiters and clears the slot if the winning resolver panics.
struct AbortGuard<'a> {
    cache: &'a ObjectCache,
    code: &'a AuthorityCode,
    latch: &'a Latch,
    armed: bool,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let err = CrsError::Factory(FactoryError::Store(format!(
            "resolver for '{}' panicked",
            self.code
        )));
        self.latch.publish(Err(Arc::new(err)));
        // Not cached as Ready: the next caller gets a fresh attempt.
        self.cache.slots.remove(self.code);
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}
