//! Infinite scrolling: load the next page when the end-of-list sentinel shows up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::feed::{Feed, LoadOutcome, PageSource};

/// Fraction of the sentinel that has to be visible before loading more.
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.1;

const DETACHED: u64 = 0;

pub struct InfiniteScroll<S: PageSource> {
    feed: Feed<S>,
    threshold: f64,
    attached: Arc<AtomicU64>,
    last_sentinel: Arc<AtomicU64>,
}

impl<S: PageSource> Clone for InfiniteScroll<S> {
    fn clone(&self) -> Self {
        InfiniteScroll {
            feed: self.feed.clone(),
            threshold: self.threshold,
            attached: self.attached.clone(),
            last_sentinel: self.last_sentinel.clone(),
        }
    }
}

impl<S: PageSource> InfiniteScroll<S> {
    pub fn new(feed: Feed<S>) -> Self {
        InfiniteScroll {
            feed,
            threshold: DEFAULT_VISIBILITY_THRESHOLD,
            attached: Arc::new(AtomicU64::new(DETACHED)),
            last_sentinel: Arc::new(AtomicU64::new(DETACHED)),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn feed(&self) -> &Feed<S> {
        &self.feed
    }

    /// Starts observing a new sentinel, replacing whichever one was observed
    /// before. Observation stops when the returned guard is dropped.
    pub fn attach(&self) -> Observation<S> {
        let sentinel = self.last_sentinel.fetch_add(1, Ordering::SeqCst) + 1;
        self.attached.store(sentinel, Ordering::SeqCst);
        debug!("Observing sentinel {sentinel}");
        Observation {
            scroll: self.clone(),
            sentinel,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst) != DETACHED
    }

    /// The sentinel came into view: dispatch the next page unless a load is
    /// already running or there is nothing left. Returns the spawned load.
    pub async fn on_sentinel_visible(&self) -> Option<JoinHandle<Result<LoadOutcome>>> {
        let dispatched = self.feed.spawn_load_more().await;
        if dispatched.is_none() {
            debug!("Sentinel visible but no page dispatched");
        }
        dispatched
    }
}

/// A sentinel being observed. Dropping it detaches the observer.
pub struct Observation<S: PageSource> {
    scroll: InfiniteScroll<S>,
    sentinel: u64,
}

impl<S: PageSource> Observation<S> {
    /// False once a newer sentinel was attached or this one was dropped.
    pub fn is_current(&self) -> bool {
        self.scroll.attached.load(Ordering::SeqCst) == self.sentinel
    }

    /// Reports the sentinel's visible fraction.
    pub async fn intersected(&self, ratio: f64) -> Option<JoinHandle<Result<LoadOutcome>>> {
        if !self.is_current() {
            debug!("Ignoring sentinel {}, no longer observed", self.sentinel);
            return None;
        }
        if ratio < self.scroll.threshold {
            return None;
        }
        self.scroll.on_sentinel_visible().await
    }
}

impl<S: PageSource> Drop for Observation<S> {
    fn drop(&mut self) {
        let detached = self
            .scroll
            .attached
            .compare_exchange(self.sentinel, DETACHED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if detached {
            debug!("Stopped observing sentinel {}", self.sentinel);
        }
    }
}
