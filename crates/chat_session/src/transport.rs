use std::future::Future;

use chat_api::{CancellationSignal, ChatApiClient, ChatApiError, ChatReply, ChatRequest, ModelList};

/// Seam between sessions and the wire.
///
/// Implemented by [`ChatApiClient`]; tests substitute scripted transports.
pub trait ChatTransport: Send + Sync {
    /// Issue one chat-completion request. Non-success statuses are returned
    /// as replies, not errors.
    fn send_chat(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> impl Future<Output = Result<ChatReply, ChatApiError>> + Send;

    fn list_models(&self) -> impl Future<Output = Result<ModelList, ChatApiError>> + Send;
}

impl ChatTransport for ChatApiClient {
    async fn send_chat(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatReply, ChatApiError> {
        self.send(request, cancellation).await
    }

    async fn list_models(&self) -> Result<ModelList, ChatApiError> {
        ChatApiClient::list_models(self).await
    }
}
