use serde::Deserialize;

use crate::error::ChatApiError;
use crate::message::{Message, Role};

/// Complete (non-streaming) chat-completion response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

impl CompletionResponse {
    /// First choice as a message carrying the envelope id.
    pub fn into_message(self) -> Result<Message, ChatApiError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or(ChatApiError::EmptyChoices)?;
        Ok(Message::new(choice.message.role, choice.message.content).with_id(self.id))
    }
}

/// Decode a full JSON response body into the first choice's message.
///
/// Missing or wrong-typed fields and an empty `choices` array are protocol
/// violations and surface as errors.
pub fn decode_completion(body: &[u8]) -> Result<Message, ChatApiError> {
    serde_json::from_slice::<CompletionResponse>(body)?.into_message()
}

/// One `data:` JSON frame of a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamFrame {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
}

/// Partial update to the message being built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamFrame {
    /// Delta of the first choice; other choices are ignored.
    pub fn delta(&self) -> Option<&Delta> {
        self.choices.first().map(|choice| &choice.delta)
    }
}

/// Response body of the model-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub owned_by: String,
}

impl ModelList {
    pub fn contains(&self, model: &str) -> bool {
        self.data.iter().any(|info| info.id == model)
    }
}
