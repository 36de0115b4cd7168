use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;

use crate::api::{NotificationApi, NotificationQuery};
use crate::error::Result;
use crate::feed::{Feed, PageSource};
use crate::models::{Notification, NotificationId};

/// Page size of the notification dropdown in the header.
pub const PREVIEW_PAGE_SIZE: u32 = 10;

pub struct NotificationSource<A> {
    api: Arc<A>,
    unread_only: bool,
}

impl<A: NotificationApi> PageSource for NotificationSource<A> {
    type Item = Notification;

    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<Notification>> {
        self.api
            .list_notifications(NotificationQuery {
                page,
                limit,
                unread_only: self.unread_only,
            })
            .await
    }
}

/// The signed-in user's notifications and their unread count.
pub struct Inbox<A: NotificationApi> {
    api: Arc<A>,
    feed: Feed<NotificationSource<A>>,
    unread: Arc<AtomicU64>,
}

impl<A> Clone for Inbox<A>
where
    A: NotificationApi,
{
    fn clone(&self) -> Self {
        Inbox {
            api: self.api.clone(),
            feed: self.feed.clone(),
            unread: self.unread.clone(),
        }
    }
}

impl<A: NotificationApi> Inbox<A> {
    pub fn new(api: Arc<A>, page_size: u32, unread_only: bool) -> Self {
        let source = NotificationSource {
            api: api.clone(),
            unread_only,
        };
        Inbox {
            api,
            feed: Feed::new(source, page_size),
            unread: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn feed(&self) -> &Feed<NotificationSource<A>> {
        &self.feed
    }

    /// Unread count as of the last refresh, adjusted for reads since.
    pub fn unread_count(&self) -> u64 {
        self.unread.load(Ordering::SeqCst)
    }

    /// Reloads the first page and the unread count.
    pub async fn refresh(&self) -> Result<()> {
        self.feed.refresh().await?;
        let count = self.api.unread_count().await?;
        self.unread.store(count, Ordering::SeqCst);
        Ok(())
    }

    /// Marks one notification read on the backend, then locally.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<()> {
        self.api.mark_read(id).await?;
        let was_unread = self
            .feed
            .with_item(id, |notification| !std::mem::replace(&mut notification.is_read, true))
            .await
            .unwrap_or(false);
        if was_unread {
            let _ = self
                .unread
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                    Some(count.saturating_sub(1))
                });
        }
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        self.api.mark_all_read().await?;
        self.feed
            .update_all(|notification| notification.is_read = true)
            .await;
        self.unread.store(0, Ordering::SeqCst);
        info!("Marked all notifications as read");
        Ok(())
    }
}
