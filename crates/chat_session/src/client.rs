use std::sync::Arc;

use crate::error::SessionError;
use crate::identity::user_id;
use crate::pool::SessionPool;
use crate::session::{Session, SessionSettings};
use crate::transport::ChatTransport;

/// Entry point: a verified model, a derived user identity and the pool of
/// that user's sessions.
pub struct ChatClient<T> {
    user_id: String,
    pool: SessionPool<T>,
}

impl<T: ChatTransport> ChatClient<T> {
    /// Check that `settings.model` is served, then build the client.
    pub async fn connect(
        transport: T,
        username: &str,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        tracing::info!("get available model list");
        let models = transport.list_models().await?;
        if !models.contains(&settings.model) {
            tracing::error!(model = %settings.model, available = models.data.len(), "model not available");
            return Err(SessionError::ModelUnavailable {
                model: settings.model,
            });
        }

        Ok(Self {
            user_id: user_id(username),
            pool: SessionPool::new(Arc::new(transport), settings),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Start a new conversation for this client's user.
    pub fn new_chat(&mut self) -> Result<&mut Session<T>, SessionError> {
        self.pool.acquire(&self.user_id)
    }

    pub fn pool(&self) -> &SessionPool<T> {
        &self.pool
    }
}
