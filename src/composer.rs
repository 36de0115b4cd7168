use std::sync::Arc;

use log::{info, warn};

use crate::api::{MediaApi, PostApi};
use crate::error::{Result, ValidationError};
use crate::feed::{Feed, PageSource};
use crate::models::{MediaFile, MediaLink, Post, PostDraft, UploadedMedia};

pub const MAX_CONTENT_CHARS: usize = 5000;
pub const MAX_ATTACHMENTS: usize = 4;
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Checks post content the way the backend would, without asking it.
/// Blank content is only allowed when the post has attachments.
pub fn validate_content(content: &str, attachments: usize) -> Result<(), ValidationError> {
    if content.trim().is_empty() && attachments == 0 {
        return Err(ValidationError::EmptyContent);
    }
    let len = content.chars().count();
    if len > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_CONTENT_CHARS,
        });
    }
    Ok(())
}

/// Builds up a new post: text, visibility and uploaded attachments.
///
/// If linking an attachment fails after the post was created, the created
/// post is kept and the next [`Composer::submit`] only links what is left.
pub struct Composer<A> {
    api: Arc<A>,
    content: String,
    is_private: bool,
    attachments: Vec<UploadedMedia>,
    created: Option<Post>,
}

impl<A: PostApi + MediaApi> Composer<A> {
    pub fn new(api: Arc<A>) -> Self {
        Composer {
            api,
            content: String::new(),
            is_private: false,
            attachments: Vec::new(),
            created: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn set_private(&mut self, is_private: bool) {
        self.is_private = is_private;
    }

    pub fn attachments(&self) -> &[UploadedMedia] {
        &self.attachments
    }

    /// Uploads a file to temporary storage. It is linked to the post on submit.
    pub async fn attach(&mut self, file: MediaFile) -> Result<&UploadedMedia> {
        if self.attachments.len() >= MAX_ATTACHMENTS {
            return Err(ValidationError::TooManyAttachments {
                max: MAX_ATTACHMENTS,
            }
            .into());
        }
        if file.size() > MAX_ATTACHMENT_BYTES {
            return Err(ValidationError::AttachmentTooLarge {
                name: file.file_name,
                size: file.bytes.len(),
                max: MAX_ATTACHMENT_BYTES,
            }
            .into());
        }
        let uploaded = self.api.upload_temp_media(file).await?;
        info!("Uploaded {} to {}", uploaded.id, uploaded.storage_path);
        self.attachments.push(uploaded);
        Ok(&self.attachments[self.attachments.len() - 1])
    }

    /// Removes an attachment that hasn't been linked to a post yet.
    pub fn detach(&mut self, index: usize) -> Option<UploadedMedia> {
        let linked = self.linked();
        (index >= linked && index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// The post created by a submit that failed while linking attachments.
    pub fn created(&self) -> Option<&Post> {
        self.created.as_ref()
    }

    fn linked(&self) -> usize {
        self.created.as_ref().map_or(0, |post| post.media.len())
    }

    /// Creates the post and links the attachments in the order they were added.
    /// The draft is cleared only once everything went through.
    pub async fn submit(&mut self) -> Result<Post> {
        let mut post = match self.created.take() {
            Some(post) => post,
            None => {
                validate_content(&self.content, self.attachments.len())?;
                let mut post = self
                    .api
                    .create_post(&PostDraft {
                        content: self.content.clone(),
                        is_private: self.is_private,
                    })
                    .await?;
                post.media.clear();
                post
            }
        };

        while let Some(attachment) = self.attachments.get(post.media.len()) {
            let link = MediaLink {
                storage_path: attachment.storage_path.clone(),
                media_type: attachment.media_type,
                order: post.media.len() as u32,
            };
            match self.api.link_media(&post.id, &link).await {
                Ok(media) => post.media.push(media),
                Err(e) => {
                    warn!(
                        "Post {} created but attachment {} couldn't be linked: {e}",
                        post.id, link.order
                    );
                    self.created = Some(post);
                    return Err(e);
                }
            }
        }

        info!(
            "Created post {} with {} attachment(s)",
            post.id,
            post.media.len()
        );
        self.content.clear();
        self.attachments.clear();
        self.is_private = false;
        Ok(post)
    }

    /// Submits the post, then reloads `feed` from its first page.
    ///
    /// A failed reload leaves the feed as it was; the new post is still returned.
    pub async fn submit_to<S: PageSource>(&mut self, feed: &Feed<S>) -> Result<Post> {
        let post = self.submit().await?;
        if let Err(e) = feed.refresh().await {
            warn!("Post {} created but the feed couldn't be reloaded: {e}", post.id);
        }
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;
    use crate::models::{AiStatus, Media, MediaId, MediaType, PostId};
    use crate::pager::LoadState;
    use crate::posts::home_feed;
    use crate::posts::tests::{post, Backend};

    #[derive(Default)]
    struct Studio {
        backend: Backend,
        uploads: Mutex<Vec<String>>,
        links: Mutex<Vec<(PostId, MediaLink)>>,
        /// Order of a link that fails once.
        broken_link: Mutex<Option<u32>>,
    }

    impl PostApi for Studio {
        async fn list_posts(&self, query: crate::api::PostQuery) -> Result<Vec<Post>> {
            self.backend.list_posts(query).await
        }

        async fn get_post(&self, id: &PostId) -> Result<Post> {
            self.backend.get_post(id).await
        }

        async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
            self.backend.create_post(draft).await
        }

        async fn update_post(&self, id: &PostId, draft: &PostDraft) -> Result<Post> {
            self.backend.update_post(id, draft).await
        }

        async fn delete_post(&self, id: &PostId) -> Result<()> {
            self.backend.delete_post(id).await
        }
    }

    impl MediaApi for Studio {
        async fn upload_temp_media(&self, file: MediaFile) -> Result<UploadedMedia> {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(file.file_name.clone());
            Ok(UploadedMedia {
                id: MediaId(format!("tmp{}", uploads.len())),
                url: format!("https://cdn.test/tmp/{}", file.file_name),
                storage_path: format!("tmp/{}", file.file_name),
                media_type: MediaType::from_mime(&file.mime_type).unwrap_or(MediaType::Image),
            })
        }

        async fn link_media(&self, post_id: &PostId, link: &MediaLink) -> Result<Media> {
            {
                let mut broken = self.broken_link.lock().unwrap();
                if *broken == Some(link.order) {
                    *broken = None;
                    return Err(Error::Status {
                        operation: "link media to post",
                        status: reqwest::StatusCode::BAD_GATEWAY,
                        detail: "storage unavailable".to_string(),
                    });
                }
            }
            self.links
                .lock()
                .unwrap()
                .push((post_id.clone(), link.clone()));
            Ok(Media {
                id: MediaId(format!("m{}", link.order)),
                post_id: Some(post_id.clone()),
                storage_path: link.storage_path.clone(),
                url: None,
                media_type: link.media_type,
                order: link.order,
                ai_perc: None,
                is_ai: None,
            })
        }

        async fn delete_media(&self, _id: &MediaId, _storage_path: &str) -> Result<()> {
            Ok(())
        }

        async fn ai_status(&self, post_id: &PostId) -> Result<AiStatus> {
            Ok(AiStatus {
                post_id: post_id.clone(),
                status: None,
                ai_perc: None,
                media: Vec::new(),
            })
        }
    }

    fn photo(name: &str, size: usize) -> MediaFile {
        MediaFile::new(name, "image/png", vec![0; size])
    }

    #[test]
    fn content_rules() {
        assert_eq!(validate_content("  \n", 0), Err(ValidationError::EmptyContent));
        assert_eq!(validate_content("", 1), Ok(()));
        assert_eq!(validate_content(&"é".repeat(MAX_CONTENT_CHARS), 0), Ok(()));
        assert_eq!(
            validate_content(&"a".repeat(MAX_CONTENT_CHARS + 1), 0),
            Err(ValidationError::ContentTooLong {
                len: MAX_CONTENT_CHARS + 1,
                max: MAX_CONTENT_CHARS
            })
        );
    }

    #[tokio::test]
    async fn empty_post_is_rejected_without_network() {
        let api = Arc::new(Studio::default());
        let mut composer = Composer::new(api.clone());

        let err = composer.submit().await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyContent)));
        assert!(api.backend.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn attachment_limits_are_checked_before_upload() {
        let api = Arc::new(Studio::default());
        let mut composer = Composer::new(api.clone());

        let err = composer
            .attach(photo("huge.png", MAX_ATTACHMENT_BYTES + 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::AttachmentTooLarge { .. })
        ));

        for i in 0..MAX_ATTACHMENTS {
            composer.attach(photo(&format!("{i}.png"), 10)).await.unwrap();
        }
        let err = composer.attach(photo("extra.png", 10)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TooManyAttachments { max: MAX_ATTACHMENTS })
        ));
        assert_eq!(api.uploads.lock().unwrap().len(), MAX_ATTACHMENTS);

        let removed = composer.detach(0).unwrap();
        assert_eq!(removed.storage_path, "tmp/0.png");
        assert!(composer.detach(10).is_none());
    }

    #[tokio::test]
    async fn submit_links_media_in_attachment_order_and_clears_the_draft() {
        let api = Arc::new(Studio::default());
        let mut composer = Composer::new(api.clone());
        composer.attach(photo("first.png", 10)).await.unwrap();
        composer
            .attach(MediaFile::new("clip.mp4", "video/mp4", vec![1; 10]))
            .await
            .unwrap();
        composer.set_private(true);

        let post = composer.submit().await.unwrap();

        assert_eq!(post.media.len(), 2);
        let links = api.links.lock().unwrap();
        assert!(links.iter().all(|(id, _)| id == &post.id));
        assert_eq!(links[0].1.storage_path, "tmp/first.png");
        assert_eq!(links[0].1.order, 0);
        assert_eq!(links[1].1.media_type, MediaType::Video);
        assert_eq!(links[1].1.order, 1);

        let created = api.backend.created.lock().unwrap();
        assert_eq!(created[0].content, "");
        assert!(created[0].is_private);

        assert!(composer.attachments().is_empty());
        assert!(!composer.is_private());
    }

    #[tokio::test]
    async fn resubmitting_after_a_failed_link_does_not_create_a_second_post() {
        let api = Arc::new(Studio {
            broken_link: Mutex::new(Some(1)),
            ..Default::default()
        });
        let mut composer = Composer::new(api.clone());
        composer.set_content("two cats");
        composer.attach(photo("a.png", 10)).await.unwrap();
        composer.attach(photo("b.png", 10)).await.unwrap();

        assert!(composer.submit().await.unwrap_err().is_remote());
        let created = composer.created().unwrap().id.clone();
        assert_eq!(composer.attachments().len(), 2);
        assert!(composer.detach(0).is_none());

        let post = composer.submit().await.unwrap();
        assert_eq!(post.id, created);
        assert_eq!(post.media.len(), 2);
        assert_eq!(api.backend.created.lock().unwrap().len(), 1);
        let orders: Vec<_> = api
            .links
            .lock()
            .unwrap()
            .iter()
            .map(|(_, link)| (link.storage_path.clone(), link.order))
            .collect();
        assert_eq!(
            orders,
            vec![("tmp/a.png".to_string(), 0), ("tmp/b.png".to_string(), 1)]
        );
        assert!(composer.created().is_none());
        assert_eq!(composer.content(), "");
    }

    #[tokio::test]
    async fn creating_a_post_reloads_the_feed_from_page_one() {
        let api = Arc::new(Studio {
            backend: Backend::with_posts((0..25).map(|i| post(&i.to_string(), 0)).collect()),
            ..Default::default()
        });
        let feed = home_feed(api.clone(), 10);
        feed.refresh().await.unwrap();
        feed.load_more().await.unwrap().unwrap();
        assert_eq!(feed.cursor().await, 2);
        assert_eq!(feed.len().await, 20);

        let mut composer = Composer::new(api.clone());
        composer.set_content("hello");
        let created = composer.submit_to(&feed).await.unwrap();

        let expected = api
            .list_posts(crate::api::PostQuery {
                page: 1,
                limit: 10,
                owner_id: None,
            })
            .await
            .unwrap();
        assert_eq!(feed.cursor().await, 1);
        assert_eq!(feed.items().await, expected);
        assert_eq!(feed.items().await[0].id, created.id);
        assert_eq!(feed.state().await, LoadState::Idle);
        assert_eq!(composer.content(), "");
    }
}
