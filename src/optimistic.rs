//! Optimistic on/off toggles with a counter, such as likes.
//!
//! The local item flips immediately, the backend is told afterwards, and the
//! flip is undone if the backend refuses. A toggle for a key that already has
//! one in flight is dropped.

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::api::LikeApi;
use crate::error::Result;
use crate::feed::{Feed, PageSource};
use crate::models::{Keyed, Post, PostId};

const RECONCILIATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub on: bool,
    pub counter: u64,
}

impl ToggleState {
    /// The state after one toggle. The counter never drops below zero.
    pub fn flipped(self) -> Self {
        if self.on {
            ToggleState {
                on: false,
                counter: self.counter.saturating_sub(1),
            }
        } else {
            ToggleState {
                on: true,
                counter: self.counter.saturating_add(1),
            }
        }
    }
}

/// Items carrying a flag plus a counter that moves with it.
pub trait Toggle: Keyed {
    fn toggle_state(&self) -> ToggleState;
    fn set_toggle_state(&mut self, state: ToggleState);
}

impl Toggle for Post {
    fn toggle_state(&self) -> ToggleState {
        ToggleState {
            on: self.is_liked,
            counter: self.like_count,
        }
    }

    fn set_toggle_state(&mut self, state: ToggleState) {
        self.is_liked = state.on;
        self.like_count = state.counter;
    }
}

/// The backend side of a toggle.
pub trait ToggleEndpoint<K>: Send + Sync + 'static {
    fn enable(&self, key: &K) -> impl Future<Output = Result<()>> + Send;
    fn disable(&self, key: &K) -> impl Future<Output = Result<()>> + Send;
}

/// Likes and unlikes posts.
pub struct Likes<A>(pub Arc<A>);

impl<A: LikeApi> ToggleEndpoint<PostId> for Likes<A> {
    async fn enable(&self, key: &PostId) -> Result<()> {
        self.0.like_post(key).await
    }

    async fn disable(&self, key: &PostId) -> Result<()> {
        self.0.unlike_post(key).await
    }
}

/// A confirmed toggle, for other views holding their own copy of the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<K> {
    pub key: K,
    pub state: ToggleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Another toggle for the same key was still in flight.
    Dropped,
    /// The feed has no item with that key.
    Missing,
    Confirmed(ToggleState),
    /// The backend call failed and the item was put back to this state.
    RolledBack(ToggleState),
}

type KeyOf<S> = <<S as PageSource>::Item as Keyed>::Key;

pub struct Toggler<S: PageSource, E> {
    feed: Feed<S>,
    endpoint: Arc<E>,
    in_flight: Arc<Mutex<HashSet<KeyOf<S>>>>,
    reconciled: broadcast::Sender<Reconciliation<KeyOf<S>>>,
}

impl<S: PageSource, E> Clone for Toggler<S, E> {
    fn clone(&self) -> Self {
        Toggler {
            feed: self.feed.clone(),
            endpoint: self.endpoint.clone(),
            in_flight: self.in_flight.clone(),
            reconciled: self.reconciled.clone(),
        }
    }
}

impl<S, E> Toggler<S, E>
where
    S: PageSource,
    S::Item: Toggle,
    E: ToggleEndpoint<KeyOf<S>>,
{
    pub fn new(feed: Feed<S>, endpoint: E) -> Self {
        let (reconciled, _) = broadcast::channel(RECONCILIATION_CAPACITY);
        Toggler {
            feed,
            endpoint: Arc::new(endpoint),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            reconciled,
        }
    }

    /// Receives every confirmed toggle made through this toggler.
    pub fn subscribe(&self) -> broadcast::Receiver<Reconciliation<KeyOf<S>>> {
        self.reconciled.subscribe()
    }

    pub fn is_in_flight(&self, key: &KeyOf<S>) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Flips the item locally, then asks the backend to do the same.
    ///
    /// Never fails: a backend error restores the item and is logged.
    pub async fn toggle(&self, key: &KeyOf<S>) -> ToggleOutcome {
        let Some(_flight) = InFlight::acquire(&self.in_flight, key) else {
            debug!("Toggle for {key:?} already in flight, dropping");
            return ToggleOutcome::Dropped;
        };

        let Some(before) = self
            .feed
            .with_item(key, |item| {
                let before = item.toggle_state();
                item.set_toggle_state(before.flipped());
                before
            })
            .await
        else {
            debug!("No item {key:?} to toggle");
            return ToggleOutcome::Missing;
        };
        let after = before.flipped();

        let result = if after.on {
            self.endpoint.enable(key).await
        } else {
            self.endpoint.disable(key).await
        };

        match result {
            Ok(()) => {
                info!("Toggled {key:?} {} ({})", on_off(after.on), after.counter);
                // Nobody listening is fine.
                let _ = self.reconciled.send(Reconciliation {
                    key: key.clone(),
                    state: after,
                });
                ToggleOutcome::Confirmed(after)
            }
            Err(e) => {
                warn!("Couldn't turn {key:?} {}, rolling back: {e}", on_off(after.on));
                self.feed
                    .with_item(key, |item| item.set_toggle_state(before))
                    .await;
                ToggleOutcome::RolledBack(before)
            }
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Marks a key busy for as long as it is held.
struct InFlight<'a, K: Eq + Hash> {
    keys: &'a Mutex<HashSet<K>>,
    key: K,
}

impl<'a, K: Eq + Hash + Clone> InFlight<'a, K> {
    fn acquire(keys: &'a Mutex<HashSet<K>>, key: &K) -> Option<Self> {
        let inserted = keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then(|| InFlight {
            keys,
            key: key.clone(),
        })
    }
}

impl<K: Eq + Hash> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl<S: PageSource> Feed<S>
where
    S::Item: Toggle,
{
    /// Applies a toggle confirmed elsewhere. Returns whether this feed holds the item.
    pub async fn reconcile(&self, update: &Reconciliation<KeyOf<S>>) -> bool {
        self.with_item(&update.key, |item| item.set_toggle_state(update.state))
            .await
            .is_some()
    }

    /// Applies every reconciliation from `updates` until the channel closes
    /// or the feed is dropped.
    pub fn follow(
        &self,
        mut updates: broadcast::Receiver<Reconciliation<KeyOf<S>>>,
    ) -> JoinHandle<()> {
        let feed = self.downgrade();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => {
                        let Some(feed) = feed.upgrade() else { break };
                        feed.reconcile(&update).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {missed} reconciliations, view may be stale");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
