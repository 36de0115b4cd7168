use std::sync::Arc;

use tokio::sync::RwLock;

/// Holds the bearer token handed out by the authentication provider.
///
/// Clones share the same token, so signing in or out through one handle is
/// seen by every client built from it.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    token: Arc<RwLock<Option<String>>>,
}

impl MemorySessionStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        MemorySessionStore {
            token: Arc::new(RwLock::new(normalize(token.into()))),
        }
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = normalize(token.into());
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    /// The current access token, `None` for an anonymous session.
    pub async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}

fn normalize(token: String) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
