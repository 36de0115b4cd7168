use std::sync::Arc;

use log::{info, warn};

use crate::api::{PostApi, ProfileApi};
use crate::error::{Result, ValidationError};
use crate::models::{MediaFile, Profile, ProfileId, ProfileUpdate};
use crate::posts::{profile_feed, PostFeed};

/// A user's profile together with their posts.
pub struct ProfileView<A: PostApi> {
    api: Arc<A>,
    profile: Profile,
    is_owner: bool,
    posts: PostFeed<A>,
}

impl<A: ProfileApi + PostApi> ProfileView<A> {
    /// Loads profile `id` as seen by `viewer`, plus the first page of their posts.
    ///
    /// Only a missing profile is an error. If the posts can't be loaded the
    /// view starts with an empty list.
    pub async fn load(
        api: Arc<A>,
        id: &ProfileId,
        viewer: Option<&ProfileId>,
        page_size: u32,
    ) -> Result<Self> {
        let profile = api.get_profile(id).await?;
        let posts = profile_feed(api.clone(), id.clone(), page_size);
        if let Err(e) = posts.refresh().await {
            warn!("Showing profile {id} without posts: {e}");
        }
        Ok(ProfileView {
            api,
            profile,
            is_owner: viewer == Some(id),
            posts,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Whether the viewer is looking at their own profile.
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    pub fn posts(&self) -> &PostFeed<A> {
        &self.posts
    }

    /// Renames the signed-in user. Meant for the owner's own profile view.
    pub async fn rename(&mut self, display_name: &str) -> Result<()> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::EmptyDisplayName.into());
        }
        self.profile = self
            .api
            .update_profile(&ProfileUpdate {
                display_name: display_name.to_string(),
                avatar_url: None,
            })
            .await?;
        info!("Renamed profile {} to {display_name}", self.profile.id);
        Ok(())
    }

    /// Uploads a new avatar for the signed-in user and returns its URL.
    pub async fn change_avatar(&mut self, file: MediaFile) -> Result<&str> {
        let upload = self.api.upload_avatar(file).await?;
        info!("Profile {} has a new avatar", self.profile.id);
        Ok(self.profile.avatar_url.insert(upload.avatar_url).as_str())
    }
}
