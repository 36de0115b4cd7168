pub mod api;
mod client;
pub mod composer;
mod config;
pub mod error;
mod feed;
pub mod models;
pub mod notifications;
pub mod optimistic;
pub mod pager;
pub mod posts;
mod profile;
pub mod scroll;
mod session;

pub use client::HttpClient;
pub use composer::Composer;
pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use feed::{Feed, LoadOutcome, PageSource, WeakFeed};
pub use models::{
    Media, MediaFile, MediaId, MediaType, Notification, NotificationId, Post, PostId, Profile,
    ProfileId,
};
pub use notifications::Inbox;
pub use optimistic::{Likes, Reconciliation, ToggleOutcome, Toggler};
pub use pager::LoadState;
pub use posts::{gallery, home_feed, open_post, profile_feed, PostFeed};
pub use profile::ProfileView;
pub use scroll::{InfiniteScroll, Observation};
pub use session::MemorySessionStore;
