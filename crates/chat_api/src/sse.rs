use crate::error::ChatApiError;
use crate::events::StreamFrame;
use crate::message::{Message, Role};

/// Prefix carried by every non-blank event line.
pub const DATA_PREFIX: &str = "data:";
/// Token that terminates a streaming response.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental splitter turning arbitrary body chunks into lines.
///
/// Bytes are buffered until a `\n` arrives so multi-byte characters split
/// across chunks decode intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk and drain every complete line, without terminators.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();

        while let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=split).collect();
            lines.push(decode_line(&line[..split]));
        }

        lines
    }

    /// Take the trailing unterminated line left when the body ends.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(decode_line(&line))
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Position of a [`StreamDecoder`] in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No data frame seen yet; the next one must carry `id` and `role`.
    AwaitingRole,
    /// Role known; content deltas are appended.
    AccumulatingContent,
    /// `[DONE]` seen.
    Done,
}

/// Outcome of feeding one line to a [`StreamDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStep {
    /// Blank line, comment, or frame without content.
    Skipped,
    /// First data frame accepted.
    Started { id: String, role: Role },
    /// Content fragment appended to the message.
    Delta(String),
    /// Sentinel reached; the message is complete.
    Done,
}

/// Line-oriented state machine reconstructing one message from a
/// streaming chat-completion body.
#[derive(Debug)]
pub struct StreamDecoder {
    state: StreamState,
    id: Option<String>,
    role: Option<Role>,
    content: String,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self {
            state: StreamState::AwaitingRole,
            id: None,
            role: None,
            content: String::new(),
        }
    }
}

impl StreamDecoder {
    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == StreamState::Done
    }

    /// Consume one line of the body.
    pub fn push_line(&mut self, line: &str) -> Result<StreamStep, ChatApiError> {
        if self.state == StreamState::Done {
            return Ok(StreamStep::Skipped);
        }

        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with(':') {
            return Ok(StreamStep::Skipped);
        }

        let token = line
            .strip_prefix(DATA_PREFIX)
            .map(str::trim_start)
            .ok_or_else(|| ChatApiError::MalformedFrame(format!("missing data prefix: {line}")))?;

        if token.contains(DONE_SENTINEL) {
            self.state = StreamState::Done;
            return Ok(StreamStep::Done);
        }

        let frame = serde_json::from_str::<StreamFrame>(token)?;

        match self.state {
            StreamState::AwaitingRole => {
                let role = frame.delta().and_then(|delta| delta.role);
                match (frame.id, role) {
                    (Some(id), Some(role)) => {
                        self.id = Some(id.clone());
                        self.role = Some(role);
                        self.state = StreamState::AccumulatingContent;
                        Ok(StreamStep::Started { id, role })
                    }
                    _ => Err(ChatApiError::MissingRole),
                }
            }
            StreamState::AccumulatingContent => {
                match frame.delta().and_then(|delta| delta.content.as_deref()) {
                    Some(content) => {
                        self.content.push_str(content);
                        Ok(StreamStep::Delta(content.to_owned()))
                    }
                    None => Ok(StreamStep::Skipped),
                }
            }
            StreamState::Done => Ok(StreamStep::Skipped),
        }
    }

    /// The reconstructed message, once the sentinel has been seen.
    ///
    /// Returns `None` before `[DONE]`, or when the stream ended without
    /// ever delivering the role frame.
    pub fn into_message(self) -> Option<Message> {
        if self.state != StreamState::Done {
            return None;
        }
        let role = self.role?;
        let mut message = Message::new(role, self.content);
        message.id = self.id;
        Some(message)
    }
}
