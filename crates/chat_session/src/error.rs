use chat_api::ChatApiError;
use history_store::HistoryStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ChatApiError),

    #[error(transparent)]
    History(#[from] HistoryStoreError),

    #[error("the model you chose is not available: {model}")]
    ModelUnavailable { model: String },
}

impl SessionError {
    pub fn api(&self) -> Option<&ChatApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.api().is_some_and(ChatApiError::is_transport)
    }

    pub fn is_protocol(&self) -> bool {
        self.api().is_some_and(ChatApiError::is_protocol)
    }
}
