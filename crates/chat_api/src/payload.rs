use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Upper bound on stop sequences accepted by the service.
pub const MAX_STOP_SEQUENCES: usize = 4;

/// Sampling options sent alongside the message history.
///
/// Values are passed through verbatim; range checking is left to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub model: String,
    /// Sampling temperature, between 0 and 2.
    pub temperature: f64,
    /// Nucleus-sampling probability mass.
    pub top_p: f64,
    /// Number of choices to generate. Only the first is read back.
    #[serde(rename = "n")]
    pub choices: u32,
    /// Request data-only server-sent events terminated by `data: [DONE]`.
    pub stream: bool,
    /// Up to four sequences where generation stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Between -2.0 and 2.0.
    pub presence_penalty: f64,
    /// Between -2.0 and 2.0.
    pub frequency_penalty: f64,
    /// End-user identifier for abuse monitoring.
    pub user: String,
}

impl SamplingOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 1.0,
            top_p: 1.0,
            choices: 1,
            stream: false,
            stop: None,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            user: String::new(),
        }
    }

    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Keeps at most [`MAX_STOP_SEQUENCES`] entries; an empty list clears the field.
    #[must_use]
    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop: Vec<String> = stop
            .into_iter()
            .take(MAX_STOP_SEQUENCES)
            .map(Into::into)
            .collect();
        self.stop = if stop.is_empty() { None } else { Some(stop) };
        self
    }
}

/// Request body for the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub options: SamplingOptions,
}

impl ChatRequest {
    /// Compose a request from history and options. No validation is applied.
    pub fn build(history: &[Message], options: &SamplingOptions) -> Self {
        Self {
            messages: history.to_vec(),
            options: options.clone(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.options.stream
    }
}
