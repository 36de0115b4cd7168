use std::future::Future;
use std::sync::{Arc, Weak};

use log::{debug, error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::Keyed;
use crate::pager::{Completion, LoadState, Page, PageRequest, Pager};

/// Where a `Feed` gets its pages from.
pub trait PageSource: Send + Sync + 'static {
    type Item: Keyed + Clone + Send + Sync + 'static;

    fn fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Self::Item>>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub page: u32,
    pub completion: Completion,
    pub state: LoadState,
}

/// A paginated, accumulating list of items backed by a `PageSource`.
///
/// A `Feed` is a handle: clones share the same list. Loads started with
/// [`Feed::spawn_load_more`] only keep a weak reference to the list, so a page
/// that arrives after every handle was dropped is thrown away.
pub struct Feed<S: PageSource> {
    source: Arc<S>,
    pager: Arc<Mutex<Pager<S::Item>>>,
    filter: Option<fn(&S::Item) -> bool>,
}

impl<S: PageSource> Clone for Feed<S> {
    fn clone(&self) -> Self {
        Feed {
            source: self.source.clone(),
            pager: self.pager.clone(),
            filter: self.filter,
        }
    }
}

pub struct WeakFeed<S: PageSource> {
    source: Arc<S>,
    pager: Weak<Mutex<Pager<S::Item>>>,
    filter: Option<fn(&S::Item) -> bool>,
}

impl<S: PageSource> WeakFeed<S> {
    pub fn upgrade(&self) -> Option<Feed<S>> {
        Some(Feed {
            source: self.source.clone(),
            pager: self.pager.upgrade()?,
            filter: self.filter,
        })
    }
}

impl<S: PageSource> Feed<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Feed {
            source: Arc::new(source),
            pager: Arc::new(Mutex::new(Pager::new(page_size))),
            filter: None,
        }
    }

    /// Keeps only the items `keep` accepts. Exhaustion is still judged on
    /// the unfiltered page size.
    pub fn with_filter(mut self, keep: fn(&S::Item) -> bool) -> Self {
        self.filter = Some(keep);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn downgrade(&self) -> WeakFeed<S> {
        WeakFeed {
            source: self.source.clone(),
            pager: Arc::downgrade(&self.pager),
            filter: self.filter,
        }
    }

    /// Loads `page`: page 1 replaces the list, later pages are appended.
    ///
    /// Failures are logged and returned; the load state goes back to what it
    /// was before the call.
    pub async fn load_page(&self, page: u32) -> Result<LoadOutcome> {
        let request = self.pager.lock().await.start(page);
        self.run(request).await
    }

    /// Reloads the list from page 1.
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        self.load_page(1).await
    }

    /// Loads the page after the cursor. Returns `None` without fetching while
    /// another load is running or once the list is exhausted.
    pub async fn load_more(&self) -> Option<Result<LoadOutcome>> {
        let request = self.pager.lock().await.start_next()?;
        Some(self.run(request).await)
    }

    /// Like [`Feed::load_more`], but the fetch runs on its own task and this
    /// returns as soon as the request is dispatched. The task yields the
    /// load's outcome.
    pub async fn spawn_load_more(&self) -> Option<JoinHandle<Result<LoadOutcome>>> {
        let request = self.pager.lock().await.start_next()?;
        let source = self.source.clone();
        let pager = Arc::downgrade(&self.pager);
        let filter = self.filter;
        Some(tokio::spawn(load(source, pager, filter, request)))
    }

    async fn run(&self, request: PageRequest) -> Result<LoadOutcome> {
        load(
            self.source.clone(),
            Arc::downgrade(&self.pager),
            self.filter,
            request,
        )
        .await
    }

    pub async fn state(&self) -> LoadState {
        self.pager.lock().await.state()
    }

    pub async fn cursor(&self) -> u32 {
        self.pager.lock().await.cursor()
    }

    pub async fn items(&self) -> Vec<S::Item> {
        self.pager.lock().await.items().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.pager.lock().await.items().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, key: &<S::Item as Keyed>::Key) -> Option<S::Item> {
        self.pager.lock().await.get(key).cloned()
    }

    /// Runs `f` on the item with `key`, if the list has one.
    pub async fn with_item<R>(
        &self,
        key: &<S::Item as Keyed>::Key,
        f: impl FnOnce(&mut S::Item) -> R,
    ) -> Option<R> {
        self.pager.lock().await.get_mut(key).map(f)
    }

    pub async fn update_all(&self, mut f: impl FnMut(&mut S::Item)) {
        for item in self.pager.lock().await.items_mut() {
            f(item);
        }
    }

    /// Swaps in a fresh copy of an item that is already in the list.
    pub async fn replace(&self, item: S::Item) -> bool {
        match self.pager.lock().await.get_mut(item.key()) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, key: &<S::Item as Keyed>::Key) -> Option<S::Item> {
        self.pager.lock().await.remove(key)
    }
}

async fn load<S: PageSource>(
    source: Arc<S>,
    pager: Weak<Mutex<Pager<S::Item>>>,
    filter: Option<fn(&S::Item) -> bool>,
    request: PageRequest,
) -> Result<LoadOutcome> {
    debug!("Requesting page {} (limit {})", request.page, request.limit);
    let fetched = source.fetch_page(request.page, request.limit).await;

    let Some(pager) = pager.upgrade() else {
        debug!("Feed dropped before page {} arrived, discarding it", request.page);
        return Ok(LoadOutcome {
            page: request.page,
            completion: Completion::Detached,
            state: LoadState::Idle,
        });
    };
    let mut pager = pager.lock().await;

    match fetched {
        Ok(items) => {
            let completion = pager.complete(request, Page::filtered(items, filter));
            match completion {
                Completion::Applied { pages, items } => info!(
                    "Loaded page {} ({} pages, {} items applied, {} total)",
                    request.page,
                    pages,
                    items,
                    pager.items().len()
                ),
                other => debug!("Page {} not applied: {:?}", request.page, other),
            }
            Ok(LoadOutcome {
                page: request.page,
                completion,
                state: pager.state(),
            })
        }
        Err(e) => {
            if pager.fail(request) {
                error!("Failed to load page {}: {}", request.page, e);
            } else {
                debug!("Stale request for page {} failed: {}", request.page, e);
            }
            Err(e)
        }
    }
}
