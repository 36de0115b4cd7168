use std::fmt;
use std::hash::Hash;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

id_type!(PostId);
id_type!(ProfileId);
id_type!(MediaId);
id_type!(NotificationId);

/// Items that live in a feed are identified by a key.
pub trait Keyed {
    type Key: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn key(&self) -> &Self::Key;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        if mime_type.starts_with("image/") {
            Some(MediaType::Image)
        } else if mime_type.starts_with("video/") {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}

/// Moderation state assigned by the backend's AI-content detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Approved,
    Rejected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    #[serde(default)]
    pub post_id: Option<PostId>,
    pub storage_path: String,
    #[serde(default)]
    pub url: Option<String>,
    pub media_type: MediaType,
    #[serde(default)]
    pub order: u32,
    /// Confidence score from AI detection.
    #[serde(default)]
    pub ai_perc: Option<f64>,
    #[serde(default)]
    pub is_ai: Option<bool>,
}

impl Media {
    /// The backend-provided URL when there is one, otherwise the storage path resolved against the media host.
    pub fn resolved_url(&self, config: &Config) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => config.media_url(&self.storage_path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub owner_id: ProfileId,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_avatar: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub like_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    /// Percentage of the post's images flagged as AI generated.
    #[serde(default)]
    pub ai_perc: Option<f64>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub is_liked: bool,
}

impl Post {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

impl Keyed for Post {
    type Key = PostId;

    fn key(&self) -> &PostId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Other(String),
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "like" => NotificationKind::Like,
            "comment" => NotificationKind::Comment,
            "follow" => NotificationKind::Follow,
            _ => NotificationKind::Other(value),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::Like => "like".to_string(),
            NotificationKind::Comment => "comment".to_string(),
            NotificationKind::Follow => "follow".to_string(),
            NotificationKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: ProfileId,
    #[serde(default)]
    pub actor_id: Option<ProfileId>,
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub actor: Option<Profile>,
    #[serde(default)]
    pub post: Option<Post>,
}

impl Keyed for Notification {
    type Key = NotificationId;

    fn key(&self) -> &NotificationId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub content: String,
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaLink {
    pub storage_path: String,
    pub media_type: MediaType,
    pub order: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A file stored by `/media/upload-temp`, not yet linked to any post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    pub id: MediaId,
    pub url: String,
    pub storage_path: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AvatarUpload {
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiStatus {
    pub post_id: PostId,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub ai_perc: Option<f64>,
    #[serde(default)]
    pub media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LikedResponse {
    pub(crate) liked: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnreadCount {
    #[serde(default)]
    pub(crate) count: u64,
}

/// File contents headed for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        MediaFile {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its mime type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Ok(MediaFile::new(file_name, mime_for_extension(&extension), bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}
