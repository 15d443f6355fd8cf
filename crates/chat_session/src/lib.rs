//! Conversation sessions on top of `chat_api` transport and
//! `history_store` persistence.
//!
//! A [`Session`] owns one bounded, persisted history and turns each
//! [`Session::send`] into a request, a decoded reply and a history update.
//! [`SessionPool`] keeps at most one live session per user, and
//! [`ChatClient`] verifies the configured model before handing sessions out.

mod client;
mod error;
mod identity;
mod pool;
mod session;
mod sink;
mod transcript;
mod transport;

pub use client::ChatClient;
pub use error::SessionError;
pub use identity::{derive_id, guest_username, session_id, unix_now, user_id, SESSION_ID_PREFIX};
pub use pool::SessionPool;
pub use session::{Session, SessionSettings, CONTEXT_TOO_LARGE};
pub use sink::{NullSink, TranscriptSink};
pub use transcript::{render_history, Transcript, HISTORY_BANNER, PROMPT_MARKER};
pub use transport::ChatTransport;
