//! Backend REST client.
//!
//! Every request carries the session cookies and, when the session has one,
//! a bearer token. Endpoints that can't be used anonymously fail with
//! [`Error::AuthenticationRequired`] before anything is sent.

use std::time::Duration;

use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::api::{LikeApi, MediaApi, NotificationApi, NotificationQuery, PostApi, PostQuery, ProfileApi};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    AiStatus, AvatarUpload, LikedResponse, Media, MediaFile, MediaId, MediaLink, Notification,
    NotificationId, Post, PostDraft, PostId, Profile, ProfileId, ProfileUpdate, UnreadCount,
    UploadedMedia,
};
use crate::session::MemorySessionStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Optional,
    Required,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    config: Config,
    session: MemorySessionStore,
}

impl HttpClient {
    pub fn new(config: Config, session: MemorySessionStore) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| Error::Transport {
                operation: "build http client",
                source,
            })?;
        Ok(HttpClient {
            http,
            config,
            session,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &MemorySessionStore {
        &self.session
    }

    async fn request(&self, method: Method, path: &str, auth: Auth) -> Result<RequestBuilder> {
        let builder = self.http.request(method, self.config.endpoint(path));
        match (self.session.access_token().await, auth) {
            (Some(token), _) => Ok(builder.bearer_auth(token)),
            (None, Auth::Optional) => Ok(builder),
            (None, Auth::Required) => Err(Error::AuthenticationRequired),
        }
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        let status = response.status();
        if status.is_success() {
            debug!("{operation}: {status}");
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("{operation}: {status}");
        Err(Error::Status {
            operation,
            status,
            detail: error_detail(&body).unwrap_or_else(|| format!("Failed to {operation}")),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T> {
        self.send(operation, builder)
            .await?
            .json()
            .await
            .map_err(|source| Error::Transport { operation, source })
    }

    async fn upload<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        file: MediaFile,
    ) -> Result<T> {
        let builder = self.request(Method::POST, path, Auth::Required).await?;
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|source| Error::Transport { operation, source })?;
        self.send_json(operation, builder.multipart(Form::new().part("file", part)))
            .await
    }
}

/// Pulls the `detail` message out of a FastAPI-style error body.
fn error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|body| body.detail)
        .filter(|detail| !detail.is_empty())
}

impl PostApi for HttpClient {
    async fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(owner_id) = query.owner_id {
            params.push(("owner_id", owner_id.0));
        }
        let builder = self.request(Method::GET, "/posts", Auth::Optional).await?;
        self.send_json("fetch posts", builder.query(&params)).await
    }

    async fn get_post(&self, id: &PostId) -> Result<Post> {
        let builder = self
            .request(Method::GET, &format!("/posts/{id}"), Auth::Optional)
            .await?;
        self.send_json("fetch post", builder).await
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        let builder = self.request(Method::POST, "/posts", Auth::Required).await?;
        self.send_json("create post", builder.json(draft)).await
    }

    async fn update_post(&self, id: &PostId, draft: &PostDraft) -> Result<Post> {
        let builder = self
            .request(Method::PATCH, &format!("/posts/{id}"), Auth::Required)
            .await?;
        self.send_json("update post", builder.json(draft)).await
    }

    async fn delete_post(&self, id: &PostId) -> Result<()> {
        let builder = self
            .request(Method::DELETE, &format!("/posts/{id}"), Auth::Required)
            .await?;
        self.send("delete post", builder).await.map(|_| ())
    }
}

impl MediaApi for HttpClient {
    async fn upload_temp_media(&self, file: MediaFile) -> Result<UploadedMedia> {
        self.upload("upload media", "/media/upload-temp", file).await
    }

    async fn link_media(&self, post_id: &PostId, link: &MediaLink) -> Result<Media> {
        let builder = self
            .request(
                Method::POST,
                &format!("/posts/{post_id}/media/link"),
                Auth::Required,
            )
            .await?;
        self.send_json("link media to post", builder.json(link)).await
    }

    async fn delete_media(&self, id: &MediaId, storage_path: &str) -> Result<()> {
        let builder = self
            .request(Method::DELETE, &format!("/media/{id}"), Auth::Required)
            .await?;
        self.send(
            "delete media",
            builder.json(&json!({ "storage_path": storage_path })),
        )
        .await
        .map(|_| ())
    }

    async fn ai_status(&self, post_id: &PostId) -> Result<AiStatus> {
        let builder = self
            .request(
                Method::GET,
                &format!("/posts/{post_id}/ai_status"),
                Auth::Required,
            )
            .await?;
        self.send_json("fetch AI status", builder).await
    }
}

impl LikeApi for HttpClient {
    async fn like_post(&self, id: &PostId) -> Result<()> {
        let builder = self
            .request(Method::POST, &format!("/posts/{id}/like"), Auth::Required)
            .await?;
        self.send("like post", builder).await.map(|_| ())
    }

    async fn unlike_post(&self, id: &PostId) -> Result<()> {
        let builder = self
            .request(Method::DELETE, &format!("/posts/{id}/like"), Auth::Required)
            .await?;
        self.send("unlike post", builder).await.map(|_| ())
    }

    async fn is_liked(&self, id: &PostId) -> bool {
        let builder = match self
            .request(Method::GET, &format!("/posts/{id}/liked"), Auth::Required)
            .await
        {
            Ok(builder) => builder,
            Err(_) => return false,
        };
        match self
            .send_json::<LikedResponse>("check like", builder)
            .await
        {
            Ok(response) => response.liked,
            Err(e) => {
                debug!("Treating post {id} as not liked: {e}");
                false
            }
        }
    }
}

impl ProfileApi for HttpClient {
    async fn get_profile(&self, id: &ProfileId) -> Result<Profile> {
        let builder = self
            .request(Method::GET, &format!("/profiles/{id}"), Auth::Optional)
            .await?;
        self.send_json("fetch profile", builder).await
    }

    async fn my_profile(&self) -> Result<Profile> {
        let builder = self
            .request(Method::GET, "/profiles/me", Auth::Required)
            .await?;
        self.send_json("fetch own profile", builder).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        let builder = self
            .request(Method::PATCH, "/profiles/me", Auth::Required)
            .await?;
        self.send_json("update profile", builder.json(update)).await
    }

    async fn upload_avatar(&self, file: MediaFile) -> Result<AvatarUpload> {
        self.upload("upload avatar", "/profiles/me/avatar", file)
            .await
    }
}

impl NotificationApi for HttpClient {
    async fn list_notifications(&self, query: NotificationQuery) -> Result<Vec<Notification>> {
        let params = [
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
            ("unread_only", query.unread_only.to_string()),
        ];
        let builder = self
            .request(Method::GET, "/notifications", Auth::Required)
            .await?;
        self.send_json("load notifications", builder.query(&params))
            .await
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<()> {
        let builder = self
            .request(
                Method::PATCH,
                &format!("/notifications/{id}/read"),
                Auth::Required,
            )
            .await?;
        self.send("mark notification as read", builder)
            .await
            .map(|_| ())
    }

    async fn mark_all_read(&self) -> Result<()> {
        let builder = self
            .request(Method::POST, "/notifications/mark-all-read", Auth::Required)
            .await?;
        self.send("mark all notifications as read", builder)
            .await
            .map(|_| ())
    }

    async fn unread_count(&self) -> Result<u64> {
        let builder = self
            .request(Method::GET, "/notifications/unread-count", Auth::Required)
            .await?;
        self.send_json::<UnreadCount>("get unread count", builder)
            .await
            .map(|count| count.count)
    }
}
