//! Page-number pagination state for an accumulating list.
//!
//! `Pager` never performs I/O. A caller starts a request, fetches the page
//! however it likes and hands the result back with [`Pager::complete`] or
//! [`Pager::fail`]. Every request carries the generation it was started in;
//! loading page 1 begins a new generation, so answers to requests from an
//! older generation are dropped instead of being appended to the fresh list.
//! Pages that arrive ahead of their predecessors are held back and applied in
//! page order.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::Keyed;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    LoadingFirstPage,
    LoadingMore,
    /// The last page applied was short. Only loading page 1 leaves this state.
    Exhausted,
}

impl LoadState {
    pub fn is_loading(self) -> bool {
        matches!(self, LoadState::LoadingFirstPage | LoadState::LoadingMore)
    }
}

/// A page request handed out by [`Pager::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    generation: u64,
}

/// One page as returned by the backend.
///
/// `fetched` is the number of items the backend sent, which decides
/// exhaustion even when some of them were filtered out of `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub fetched: usize,
}

impl<T> Page<T> {
    pub fn filtered(items: Vec<T>, keep: Option<fn(&T) -> bool>) -> Self {
        let fetched = items.len();
        let items = match keep {
            Some(keep) => items.into_iter().filter(|item| keep(item)).collect(),
            None => items,
        };
        Page { items, fetched }
    }
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(items: Vec<T>) -> Self {
        Page::filtered(items, None)
    }
}

/// What happened to a completed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The page (and any held-back pages it unblocked) went into the list.
    Applied { pages: u32, items: usize },
    /// An earlier page is still missing; the page is held until it shows up.
    Buffered,
    /// The page was already applied.
    Duplicate,
    /// The list was reloaded after this request was started.
    Stale,
    /// Every handle to the list was dropped before the page arrived.
    Detached,
}

#[derive(Debug, Clone)]
pub struct Pager<T> {
    items: Vec<T>,
    page_size: u32,
    cursor: u32,
    state: LoadState,
    settled: LoadState,
    generation: u64,
    /// Page 1 of the current generation hasn't been applied yet.
    reloading: bool,
    outstanding: BTreeSet<u32>,
    held: BTreeMap<u32, Page<T>>,
}

impl<T> Pager<T> {
    pub fn new(page_size: u32) -> Self {
        Pager {
            items: Vec::new(),
            page_size: page_size.max(1),
            cursor: 0,
            state: LoadState::Idle,
            settled: LoadState::Idle,
            generation: 0,
            reloading: false,
            outstanding: BTreeSet::new(),
            held: BTreeMap::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of the last page applied, 0 before the first one.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Starts loading `page`. Page 1 reloads the list from scratch.
    pub fn start(&mut self, page: u32) -> PageRequest {
        let page = page.max(1);
        if page == 1 {
            self.generation += 1;
            self.reloading = true;
            self.held.clear();
            self.outstanding.clear();
        }
        self.outstanding.insert(page);
        self.refresh_state();
        PageRequest {
            page,
            limit: self.page_size,
            generation: self.generation,
        }
    }

    /// Starts loading the page after the cursor, unless a load is already
    /// running or the list is exhausted.
    pub fn start_next(&mut self) -> Option<PageRequest> {
        if self.state.is_loading() || self.state == LoadState::Exhausted {
            return None;
        }
        Some(self.start(self.cursor + 1))
    }

    pub fn complete(&mut self, request: PageRequest, page: Page<T>) -> Completion {
        if request.generation != self.generation {
            return Completion::Stale;
        }
        self.outstanding.remove(&request.page);

        if request.page == 1 {
            self.items.clear();
            self.cursor = 0;
            self.reloading = false;
        } else if self.reloading || request.page > self.cursor + 1 {
            self.held.insert(request.page, page);
            self.refresh_state();
            return Completion::Buffered;
        } else if request.page <= self.cursor {
            self.refresh_state();
            return Completion::Duplicate;
        }

        let (mut pages, mut items) = (0, 0);
        let mut next = Some(page);
        while let Some(page) = next {
            let exhausted = page.fetched < self.page_size as usize;
            pages += 1;
            items += page.items.len();
            self.items.extend(page.items);
            self.cursor += 1;
            if exhausted {
                self.held.clear();
                self.settled = LoadState::Exhausted;
                self.refresh_state();
                return Completion::Applied { pages, items };
            }
            next = self.held.remove(&(self.cursor + 1));
        }
        self.settled = LoadState::Idle;
        self.refresh_state();
        Completion::Applied { pages, items }
    }

    /// Marks a request as failed, putting the load state back to where it
    /// was before loading began. Returns `false` for stale requests.
    pub fn fail(&mut self, request: PageRequest) -> bool {
        if request.generation != self.generation {
            return false;
        }
        self.outstanding.remove(&request.page);
        if request.page == 1 {
            // The old list stays, so later pages continue from the old cursor.
            self.reloading = false;
            self.held.clear();
        }
        self.refresh_state();
        true
    }

    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Loading while any request of the current generation is out,
    /// otherwise whatever the last applied page left behind.
    fn refresh_state(&mut self) {
        self.state = if self.outstanding.contains(&1) {
            LoadState::LoadingFirstPage
        } else if !self.outstanding.is_empty() {
            LoadState::LoadingMore
        } else {
            self.settled
        };
    }
}

impl<T: Keyed> Pager<T> {
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn get_mut(&mut self, key: &T::Key) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        Some(self.items.remove(index))
    }
}
