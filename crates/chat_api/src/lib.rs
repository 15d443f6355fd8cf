//! Transport and wire-format primitives for a chat-completion endpoint.
//!
//! This crate owns request building, HTTP transport and response decoding
//! only. Conversation history, persistence and session lifecycle live in
//! `history_store` and `chat_session`.
//!
//! Streaming bodies are decoded line by line with [`StreamDecoder`]; complete
//! JSON bodies are decoded with [`decode_completion`]. Both produce a
//! [`Message`] carrying the service-assigned id.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod message;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use client::{await_or_cancel, is_cancelled, CancellationSignal, ChatApiClient, ChatReply};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use events::{decode_completion, CompletionResponse, ModelInfo, ModelList, StreamFrame};
pub use message::{Message, Role};
pub use payload::{ChatRequest, SamplingOptions};
pub use retry::ResendPolicy;
pub use sse::{LineBuffer, StreamDecoder, StreamState, StreamStep};
pub use url::{chat_completions_url, models_url, DEFAULT_BASE_URL};

pub use reqwest::StatusCode;
