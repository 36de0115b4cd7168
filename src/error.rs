use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// No session token is available for an endpoint that needs one.
    /// Raised before any request is sent.
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} failed ({status}): {detail}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        detail: String,
    },

    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Couldn't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True for failures that came back from (or on the way to) the backend,
    /// as opposed to ones raised locally.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Status { .. } | Error::Transport { .. })
    }
}

/// Client-side checks that run before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Post needs some content or at least one attachment")]
    EmptyContent,

    #[error("Post content is {len} characters, the limit is {max}")]
    ContentTooLong { len: usize, max: usize },

    #[error("At most {max} attachments are allowed")]
    TooManyAttachments { max: usize },

    #[error("\"{name}\" is {size} bytes, attachments must be under {max} bytes")]
    AttachmentTooLarge { name: String, size: usize, max: usize },

    #[error("Display name can't be empty")]
    EmptyDisplayName,
}
