use std::future::Future;

use crate::error::Result;
use crate::models::{
    AiStatus, AvatarUpload, Media, MediaFile, MediaId, MediaLink, Notification, NotificationId,
    Post, PostDraft, PostId, Profile, ProfileId, ProfileUpdate, UploadedMedia,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub page: u32,
    pub limit: u32,
    pub owner_id: Option<ProfileId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationQuery {
    pub page: u32,
    pub limit: u32,
    pub unread_only: bool,
}

pub trait PostApi: Send + Sync + 'static {
    fn list_posts(&self, query: PostQuery) -> impl Future<Output = Result<Vec<Post>>> + Send;
    fn get_post(&self, id: &PostId) -> impl Future<Output = Result<Post>> + Send;
    fn create_post(&self, draft: &PostDraft) -> impl Future<Output = Result<Post>> + Send;
    fn update_post(&self, id: &PostId, draft: &PostDraft)
        -> impl Future<Output = Result<Post>> + Send;
    fn delete_post(&self, id: &PostId) -> impl Future<Output = Result<()>> + Send;
}

pub trait MediaApi: Send + Sync + 'static {
    fn upload_temp_media(
        &self,
        file: MediaFile,
    ) -> impl Future<Output = Result<UploadedMedia>> + Send;
    fn link_media(
        &self,
        post_id: &PostId,
        link: &MediaLink,
    ) -> impl Future<Output = Result<Media>> + Send;
    fn delete_media(
        &self,
        id: &MediaId,
        storage_path: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn ai_status(&self, post_id: &PostId) -> impl Future<Output = Result<AiStatus>> + Send;
}

pub trait LikeApi: Send + Sync + 'static {
    fn like_post(&self, id: &PostId) -> impl Future<Output = Result<()>> + Send;
    fn unlike_post(&self, id: &PostId) -> impl Future<Output = Result<()>> + Send;
    /// Whether the signed-in user likes the post. Anonymous sessions and
    /// failed checks both answer `false`.
    fn is_liked(&self, id: &PostId) -> impl Future<Output = bool> + Send;
}

pub trait ProfileApi: Send + Sync + 'static {
    fn get_profile(&self, id: &ProfileId) -> impl Future<Output = Result<Profile>> + Send;
    fn my_profile(&self) -> impl Future<Output = Result<Profile>> + Send;
    fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<Profile>> + Send;
    fn upload_avatar(&self, file: MediaFile) -> impl Future<Output = Result<AvatarUpload>> + Send;
}

pub trait NotificationApi: Send + Sync + 'static {
    fn list_notifications(
        &self,
        query: NotificationQuery,
    ) -> impl Future<Output = Result<Vec<Notification>>> + Send;
    fn mark_read(&self, id: &NotificationId) -> impl Future<Output = Result<()>> + Send;
    fn mark_all_read(&self) -> impl Future<Output = Result<()>> + Send;
    fn unread_count(&self) -> impl Future<Output = Result<u64>> + Send;
}
