use chat_api::{Message, Role};

/// Marker written in front of every user prompt.
pub const PROMPT_MARKER: &str = "==> ";

/// Separator written after replayed history.
pub const HISTORY_BANNER: &str = "\n\n========== History ==========\n\n";

/// Running display text of a session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    /// Transcript seeded with replayed history and the history banner.
    #[must_use]
    pub fn replay(messages: &[Message]) -> Self {
        let mut text = render_history(messages);
        text.push_str(HISTORY_BANNER);
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn push_prompt(&mut self, prompt: &str) {
        self.text.push_str(PROMPT_MARKER);
        self.text.push_str(prompt);
        self.text.push('\n');
    }

    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Drop everything after the first `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.text.truncate(len);
    }
}

/// Alternating prompt/response blocks for persisted history.
///
/// System entries are not shown.
#[must_use]
pub fn render_history(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        match message.role {
            Role::User => {
                out.push_str(PROMPT_MARKER);
                out.push_str(&message.content);
                out.push_str("\n\n");
            }
            Role::Assistant => {
                out.push_str(&message.content);
                out.push_str("\n\n");
            }
            Role::System => {}
        }
    }
    out
}
