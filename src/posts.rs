use std::sync::Arc;

use log::info;

use crate::api::{LikeApi, PostApi, PostQuery};
use crate::composer::validate_content;
use crate::error::Result;
use crate::feed::{Feed, PageSource};
use crate::models::{Media, Post, PostDraft, PostId, ProfileId};

pub const GALLERY_PAGE_SIZE: u32 = 50;

/// Pages of posts, optionally limited to one author.
pub struct PostSource<A> {
    api: Arc<A>,
    owner_id: Option<ProfileId>,
}

impl<A> PostSource<A> {
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn owner_id(&self) -> Option<&ProfileId> {
        self.owner_id.as_ref()
    }
}

impl<A: PostApi> PageSource for PostSource<A> {
    type Item = Post;

    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<Post>> {
        self.api
            .list_posts(PostQuery {
                page,
                limit,
                owner_id: self.owner_id.clone(),
            })
            .await
    }
}

pub type PostFeed<A> = Feed<PostSource<A>>;

/// Everyone's posts, newest first.
pub fn home_feed<A: PostApi>(api: Arc<A>, page_size: u32) -> PostFeed<A> {
    Feed::new(PostSource { api, owner_id: None }, page_size)
}

pub fn profile_feed<A: PostApi>(api: Arc<A>, owner_id: ProfileId, page_size: u32) -> PostFeed<A> {
    Feed::new(
        PostSource {
            api,
            owner_id: Some(owner_id),
        },
        page_size,
    )
}

/// Posts that have at least one image or video.
pub fn gallery<A: PostApi>(api: Arc<A>) -> PostFeed<A> {
    Feed::new(PostSource { api, owner_id: None }, GALLERY_PAGE_SIZE).with_filter(Post::has_media)
}

impl<A: PostApi> PostFeed<A> {
    /// Saves new content for a post and swaps the saved copy into the feed.
    pub async fn edit(&self, id: &PostId, content: &str, is_private: bool) -> Result<Post> {
        validate_content(content, 0)?;
        let draft = PostDraft {
            content: content.to_string(),
            is_private,
        };
        let post = self.source().api().update_post(id, &draft).await?;
        self.replace(post.clone()).await;
        info!("Updated post {id}");
        Ok(post)
    }

    pub async fn delete(&self, id: &PostId) -> Result<()> {
        self.source().api().delete_post(id).await?;
        self.remove(id).await;
        info!("Deleted post {id}");
        Ok(())
    }

    /// Every attachment in the feed paired with its post, in display order.
    pub async fn gallery_entries(&self) -> Vec<(Post, Media)> {
        self.items()
            .await
            .into_iter()
            .flat_map(|post| {
                let mut media = post.media.clone();
                media.sort_by_key(|media| media.order);
                media.into_iter().map(move |media| (post.clone(), media))
            })
            .collect()
    }
}

/// Fetches a single post, resolving whether the viewer likes it when the
/// payload doesn't already say so.
pub async fn open_post<A: PostApi + LikeApi>(api: &A, id: &PostId) -> Result<Post> {
    let mut post = api.get_post(id).await?;
    if !post.is_liked {
        post.is_liked = api.is_liked(id).await;
    }
    Ok(post)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;

    use super::*;
    use crate::error::{Error, ValidationError};
    use crate::models::{MediaId, MediaType};

    pub(crate) fn post(id: &str, media: usize) -> Post {
        Post {
            id: PostId::from(id),
            owner_id: ProfileId::from("owner"),
            owner_name: Some("Owner".to_string()),
            owner_avatar: None,
            content: Some(format!("post {id}")),
            is_private: false,
            like_count: 0,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            status: None,
            ai_perc: None,
            media: (0..media)
                .map(|order| Media {
                    id: MediaId(format!("{id}-m{order}")),
                    post_id: Some(PostId::from(id)),
                    storage_path: format!("{id}/{order}.png"),
                    url: None,
                    media_type: MediaType::Image,
                    order: (media - order - 1) as u32,
                    ai_perc: None,
                    is_ai: None,
                })
                .collect(),
            is_liked: false,
        }
    }

    /// An in-memory backend that pages over a list of posts.
    #[derive(Default)]
    pub(crate) struct Backend {
        pub(crate) posts: Mutex<Vec<Post>>,
        pub(crate) queries: Mutex<Vec<PostQuery>>,
        pub(crate) created: Mutex<Vec<PostDraft>>,
        pub(crate) liked: bool,
    }

    impl Backend {
        pub(crate) fn with_posts(posts: Vec<Post>) -> Self {
            Backend {
                posts: Mutex::new(posts),
                ..Default::default()
            }
        }

        fn not_found() -> Error {
            Error::Status {
                operation: "fetch post",
                status: StatusCode::NOT_FOUND,
                detail: "Post not found".to_string(),
            }
        }
    }

    impl PostApi for Backend {
        async fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
            self.queries.lock().unwrap().push(query.clone());
            let posts = self.posts.lock().unwrap();
            let start = ((query.page - 1) * query.limit) as usize;
            Ok(posts
                .iter()
                .filter(|post| query.owner_id.as_ref().map_or(true, |owner| &post.owner_id == owner))
                .skip(start)
                .take(query.limit as usize)
                .cloned()
                .collect())
        }

        async fn get_post(&self, id: &PostId) -> Result<Post> {
            let posts = self.posts.lock().unwrap();
            posts
                .iter()
                .find(|post| &post.id == id)
                .cloned()
                .ok_or_else(Backend::not_found)
        }

        async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
            self.created.lock().unwrap().push(draft.clone());
            let mut posts = self.posts.lock().unwrap();
            let mut created = post(&format!("new{}", posts.len()), 0);
            created.content = Some(draft.content.clone());
            created.is_private = draft.is_private;
            posts.insert(0, created.clone());
            Ok(created)
        }

        async fn update_post(&self, id: &PostId, draft: &PostDraft) -> Result<Post> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .iter_mut()
                .find(|post| &post.id == id)
                .ok_or_else(Backend::not_found)?;
            post.content = Some(draft.content.clone());
            post.is_private = draft.is_private;
            Ok(post.clone())
        }

        async fn delete_post(&self, id: &PostId) -> Result<()> {
            self.posts.lock().unwrap().retain(|post| &post.id != id);
            Ok(())
        }
    }

    impl LikeApi for Backend {
        async fn like_post(&self, _id: &PostId) -> Result<()> {
            Ok(())
        }

        async fn unlike_post(&self, _id: &PostId) -> Result<()> {
            Ok(())
        }

        async fn is_liked(&self, _id: &PostId) -> bool {
            self.liked
        }
    }

    #[tokio::test]
    async fn profile_feed_only_requests_the_owner() {
        let mut theirs = post("b", 0);
        theirs.owner_id = ProfileId::from("someone-else");
        let api = Arc::new(Backend::with_posts(vec![post("a", 0), theirs]));
        let feed = profile_feed(api.clone(), ProfileId::from("owner"), 10);
        feed.refresh().await.unwrap();

        assert_eq!(feed.len().await, 1);
        let queries = api.queries.lock().unwrap();
        assert_eq!(queries[0].owner_id, Some(ProfileId::from("owner")));
        assert_eq!(queries[0].limit, 10);
    }

    #[tokio::test]
    async fn gallery_keeps_posts_with_media_in_order() {
        let api = Arc::new(Backend::with_posts(vec![
            post("a", 2),
            post("b", 0),
            post("c", 1),
        ]));
        let feed = gallery(api.clone());
        feed.refresh().await.unwrap();

        let ids: Vec<_> = feed.items().await.into_iter().map(|post| post.id.0).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(api.queries.lock().unwrap()[0].limit, GALLERY_PAGE_SIZE);

        let entries: Vec<_> = feed
            .gallery_entries()
            .await
            .into_iter()
            .map(|(post, media)| (post.id.0, media.order))
            .collect();
        assert_eq!(
            entries,
            vec![("a".to_string(), 0), ("a".to_string(), 1), ("c".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn edit_updates_the_feed_copy() {
        let api = Arc::new(Backend::with_posts(vec![post("a", 0), post("b", 0)]));
        let feed = home_feed(api, 10);
        feed.refresh().await.unwrap();

        let saved = feed.edit(&PostId::from("b"), "edited", true).await.unwrap();
        assert!(saved.is_private);
        let in_feed = feed.get(&PostId::from("b")).await.unwrap();
        assert_eq!(in_feed.content.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn edit_rejects_blank_content_before_calling_the_backend() {
        let api = Arc::new(Backend::with_posts(vec![post("a", 0)]));
        let feed = home_feed(api.clone(), 10);
        feed.refresh().await.unwrap();

        let err = feed.edit(&PostId::from("a"), "   ", false).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyContent)));
        assert_eq!(
            api.posts.lock().unwrap()[0].content.as_deref(),
            Some("post a")
        );
    }

    #[tokio::test]
    async fn delete_removes_the_post_locally() {
        let api = Arc::new(Backend::with_posts(vec![post("a", 0), post("b", 0)]));
        let feed = home_feed(api, 10);
        feed.refresh().await.unwrap();

        feed.delete(&PostId::from("a")).await.unwrap();
        assert_eq!(feed.get(&PostId::from("a")).await, None);
        assert_eq!(feed.len().await, 1);
    }

    #[tokio::test]
    async fn open_post_resolves_the_like_flag() {
        let api = Backend {
            liked: true,
            ..Backend::with_posts(vec![post("a", 0)])
        };
        assert!(open_post(&api, &PostId::from("a")).await.unwrap().is_liked);

        let err = open_post(&api, &PostId::from("zzz")).await.unwrap_err();
        assert!(matches!(err, Error::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }
}
