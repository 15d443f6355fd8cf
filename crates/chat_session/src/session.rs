use std::path::PathBuf;
use std::sync::Arc;

use chat_api::error::parse_error_message;
use chat_api::{
    await_or_cancel, decode_completion, is_cancelled, CancellationSignal, ChatApiError, ChatReply,
    ChatRequest, LineBuffer, Message, ResendPolicy, SamplingOptions, StatusCode, StreamDecoder,
    StreamStep,
};
use futures_util::StreamExt;
use history_store::{HistoryStore, DEFAULT_CAPACITY};

use crate::error::SessionError;
use crate::sink::TranscriptSink;
use crate::transcript::Transcript;
use crate::transport::ChatTransport;

/// Status the service answers with when the conversation no longer fits.
pub const CONTEXT_TOO_LARGE: StatusCode = StatusCode::BAD_REQUEST;

/// Settings shared by every session a pool creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub model: String,
    pub history_path: PathBuf,
    pub capacity: usize,
    /// Default: true.
    pub streaming: bool,
    /// Load persisted history when a session is created. Default: true.
    pub restore_history: bool,
    pub resend: ResendPolicy,
}

impl SessionSettings {
    pub fn new(model: impl Into<String>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            history_path: history_path.into(),
            capacity: DEFAULT_CAPACITY,
            streaming: true,
            restore_history: true,
            resend: ResendPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    #[must_use]
    pub fn with_restore_history(mut self, restore_history: bool) -> Self {
        self.restore_history = restore_history;
        self
    }

    #[must_use]
    pub fn with_resend_policy(mut self, resend: ResendPolicy) -> Self {
        self.resend = resend;
        self
    }
}

/// One persisted conversation.
///
/// `send` takes `&mut self`, so a session has at most one exchange in
/// flight.
pub struct Session<T> {
    id: String,
    transport: Arc<T>,
    options: SamplingOptions,
    history: HistoryStore,
    resend: ResendPolicy,
    transcript: Transcript,
}

impl<T: ChatTransport> Session<T> {
    pub fn new(
        id: impl Into<String>,
        user: impl Into<String>,
        transport: Arc<T>,
        settings: &SessionSettings,
    ) -> Result<Self, SessionError> {
        let history = HistoryStore::new(&settings.history_path, settings.capacity)?;
        let options = SamplingOptions::new(&settings.model)
            .with_stream(settings.streaming)
            .with_user(user);

        Ok(Self {
            id: id.into(),
            transport,
            options,
            history,
            resend: settings.resend,
            transcript: Transcript::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    pub fn history(&self) -> &[Message] {
        self.history.messages()
    }

    pub fn transcript(&self) -> &str {
        self.transcript.as_str()
    }

    pub fn is_streaming(&self) -> bool {
        self.options.stream
    }

    /// Load persisted history into this session. Returns the entry count.
    pub fn restore(&mut self) -> Result<usize, SessionError> {
        Ok(self.history.hydrate()?)
    }

    /// Rebuild the transcript from history and show it in full.
    pub fn replay_history(&mut self, sink: &mut dyn TranscriptSink) {
        self.transcript = Transcript::replay(self.history.messages());
        sink.replace(self.transcript.as_str());
    }

    pub async fn send(
        &mut self,
        text: &str,
        sink: &mut dyn TranscriptSink,
    ) -> Result<Message, SessionError> {
        self.send_with_cancel(text, sink, None).await
    }

    /// Send `text` as the next user message and return the assistant reply.
    ///
    /// Streamed deltas are pushed to `sink` as they arrive. A non-streamed
    /// reply is only returned; showing it is up to the caller.
    ///
    /// The user message is only persisted together with the reply. On
    /// failure it is rolled back from memory, except when the service
    /// reports [`CONTEXT_TOO_LARGE`]: history is then cut to its newest
    /// entry and saved, and the caller may retry.
    pub async fn send_with_cancel(
        &mut self,
        text: &str,
        sink: &mut dyn TranscriptSink,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Message, SessionError> {
        self.history.push_unsaved(Message::user(text));
        self.transcript.push_prompt(text);
        let request = ChatRequest::build(self.history.window(), &self.options);

        match self.exchange(&request, sink, cancellation).await {
            Ok(message) => {
                self.history.append([message.clone()])?;
                Ok(message)
            }
            Err(ChatApiError::Status(status, body)) if status == CONTEXT_TOO_LARGE => {
                tracing::warn!(session = %self.id, "conversation too long, keeping last message only");
                self.history.truncate_to_last()?;
                Err(ChatApiError::Status(status, body).into())
            }
            Err(error) => {
                self.history.rollback_last();
                tracing::error!(session = %self.id, %error, "send failed, user message rolled back");
                Err(error.into())
            }
        }
    }

    async fn exchange(
        &mut self,
        request: &ChatRequest,
        sink: &mut dyn TranscriptSink,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Message, ChatApiError> {
        let attempts = self.resend.max_attempts();

        for attempt in 0..attempts {
            let shown = self.transcript.len();
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }

            let reply = self.transport.send_chat(request, cancellation).await?;
            if !reply.is_success() {
                return Err(read_status_error(reply, cancellation).await?);
            }

            if !request.is_streaming() {
                tracing::debug!(session = %self.id, "decoding non-streaming reply");
                let body = await_or_cancel(reply.into_bytes(), cancellation).await??;
                let message = decode_completion(&body)?;
                self.transcript.push(&message.content);
                self.transcript.push("\n");
                return Ok(message);
            }

            if let Some(message) = self.read_stream(reply, sink, cancellation).await? {
                return Ok(message);
            }

            // Deltas of the dropped attempt never reach history.
            self.transcript.truncate(shown);
            sink.replace(self.transcript.as_str());

            if self.resend.allows_resend(attempt) {
                tracing::warn!(
                    session = %self.id,
                    attempt = attempt + 1,
                    "stream closed before [DONE], resending"
                );
            }
        }

        Err(ChatApiError::ResendExhausted { attempts })
    }

    /// Decode one streaming body. `Ok(None)` means the body ended cleanly
    /// before the sentinel.
    async fn read_stream(
        &mut self,
        reply: ChatReply,
        sink: &mut dyn TranscriptSink,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Option<Message>, ChatApiError> {
        let mut body = reply.body;
        let mut lines = LineBuffer::default();
        let mut decoder = StreamDecoder::default();

        loop {
            let chunk = await_or_cancel(body.next(), cancellation).await?;
            let at_end = chunk.is_none();
            let ready = match chunk {
                Some(chunk) => lines.feed(&chunk?),
                None => lines.finish().into_iter().collect(),
            };

            for line in ready {
                match decoder.push_line(&line)? {
                    StreamStep::Started { id, role } => {
                        tracing::debug!(session = %self.id, %id, role = role.as_str(), "stream started");
                    }
                    StreamStep::Delta(delta) => {
                        self.transcript.push(&delta);
                        sink.append(&delta);
                    }
                    StreamStep::Skipped => {}
                    StreamStep::Done => {
                        self.transcript.push("\n");
                        return decoder
                            .into_message()
                            .map(Some)
                            .ok_or(ChatApiError::MissingRole);
                    }
                }
            }

            if at_end {
                return Ok(None);
            }
        }
    }
}

async fn read_status_error(
    reply: ChatReply,
    cancellation: Option<&CancellationSignal>,
) -> Result<ChatApiError, ChatApiError> {
    let status = reply.status;
    let body = await_or_cancel(reply.into_text(), cancellation)
        .await?
        .unwrap_or_default();
    tracing::warn!(%status, %body, "chat request rejected");
    Ok(ChatApiError::Status(status, parse_error_message(status, &body)))
}
