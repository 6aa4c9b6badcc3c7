//! Request deduplication ("singleflight") for report computation.
//!
//! Multiple simultaneous requests for the same uncached report must not
//! trigger redundant fetch+aggregate cycles against the upstream data
//! source; exactly one computation per key may be in flight at a time.
//!
//! # Registration Ordering
//!
//! The one subtle invariant: registration happens atomically with the
//! not-present check (sharded map entry API) and completes before the
//! compute path first suspends. Two logically concurrent callers can
//! therefore never both observe "not in flight" — the second always joins
//! the first's shared future.
//!
//! # Deadlock Prevention
//!
//! The map entry guard is held only while cloning the shared future handle
//! and is dropped before any await. **NEVER** hold a `DashMap` entry
//! reference across await points.

use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// An in-flight computation: the shared future every coalesced caller
/// awaits, plus a start timestamp for stale-entry sweeping.
#[derive(Clone)]
struct Flight<T: Clone> {
    future: Shared<BoxFuture<'static, T>>,
    started_at: Instant,
}

/// Collapses concurrent `run` calls sharing a key into one underlying
/// computation.
///
/// The output type is typically a `Result` with cheaply clonable sides
/// (`Arc`ed values and errors); failure settles the flight exactly like
/// success, propagates to every waiter, and never poisons later calls for
/// the same key.
pub struct Singleflight<T: Clone> {
    inflight: DashMap<String, Flight<T>>,
}

impl<T> Singleflight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self { inflight: DashMap::new() }
    }

    /// Runs `compute` under `key`, or joins the computation already in
    /// flight for that key.
    ///
    /// `compute` is invoked at most once per flight; every caller receives a
    /// clone of the same settled output. The registration is removed when
    /// the flight settles, regardless of outcome.
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        // Fast path: join an existing flight.
        if let Some(flight) = self.inflight.get(key) {
            let shared = flight.future.clone();
            drop(flight);
            debug!(key = key, "joined in-flight computation");
            return shared.await;
        }

        let (shared, leader) = match self.inflight.entry(key.to_owned()) {
            // Lost the race to another registration between the fast path
            // and here; join it instead.
            Entry::Occupied(entry) => (entry.get().future.clone(), false),
            Entry::Vacant(entry) => {
                let shared = compute().boxed().shared();
                entry.insert(Flight { future: shared.clone(), started_at: Instant::now() });
                (shared, true)
            }
        };
        // Entry guard dropped here, before the first await.

        let output = shared.await;
        if leader {
            self.inflight.remove(key);
        }
        output
    }

    /// Drops registrations older than `max_age`.
    ///
    /// Settled flights deregister themselves; this sweep only bounds memory
    /// against a leaked registration from a computation that never settles
    /// (or whose leader task was torn down before deregistering). Returns
    /// the number of entries removed.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        let before = self.inflight.len();
        self.inflight.retain(|_, flight| flight.started_at.elapsed() <= max_age);
        let removed = before - self.inflight.len();
        if removed > 0 {
            warn!(removed = removed, "purged stale in-flight registrations");
        }
        removed
    }

    /// Number of currently registered flights. Intended for tests and
    /// diagnostics.
    #[must_use]
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}

impl<T> Default for Singleflight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
