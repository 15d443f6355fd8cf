//! Line-oriented chat loop on stdin/stdout.

use std::io::{self, Write};
use std::path::PathBuf;

use chat_api::{ChatApiClient, Message};
use chat_session::{ChatClient, ChatTransport, Session, TranscriptSink, PROMPT_MARKER};
use clap::Parser;
use history_store::HISTORY_FILE_NAME;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};

/// Chat with a chat-completion service from the terminal.
#[derive(Parser, Debug)]
#[command(name = "chatline", version, about, long_about = None)]
pub struct Cli {
    /// JSON file holding apiKey, model and optional settings.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// File the conversation history is persisted to.
    #[arg(long, default_value = HISTORY_FILE_NAME)]
    pub history: PathBuf,

    /// Directory for the per-run log file.
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Request whole replies instead of streamed deltas.
    #[arg(long)]
    pub no_stream: bool,

    /// Start with an empty conversation instead of the persisted one.
    #[arg(long)]
    pub no_restore: bool,
}

impl Cli {
    pub async fn run(self) -> io::Result<()> {
        let config = AppConfig::load(&self.config).map_err(io::Error::other)?;
        let api_config = config.api_config();
        tracing::info!(
            api_key = %api_config.masked_api_key(),
            model = %config.model,
            username = %config.username,
            capacity = config.capacity,
            "start with config"
        );

        let transport = ChatApiClient::new(api_config).map_err(io::Error::other)?;
        let settings = config
            .session_settings(&self.history)
            .with_streaming(config.stream && !self.no_stream)
            .with_restore_history(!self.no_restore);

        let mut client = ChatClient::connect(transport, &config.username, settings)
            .await
            .map_err(io::Error::other)?;
        tracing::info!(user = client.user_id(), "chat client created");

        let session = client.new_chat().map_err(io::Error::other)?;
        let mut console = StdoutSink::default();
        if !session.history().is_empty() {
            session.replay_history(&mut console);
        }

        chat_loop(session, &mut console).await
    }
}

/// Read prompts until stdin closes. Send failures are reported and the loop
/// continues with history as the session left it.
async fn chat_loop<T: ChatTransport, W: Write>(
    session: &mut Session<T>,
    console: &mut ConsoleSink<W>,
) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        console.write(PROMPT_MARKER)?;
        let Some(line) = lines.next_line().await? else {
            return console.write("\n");
        };
        if line.trim().is_empty() {
            continue;
        }

        console.write(&format!("<== [{}]\n", rfc1123(OffsetDateTime::now_utc())))?;
        match session.send(&line, console).await {
            Ok(reply) => {
                tracing::debug!(id = ?reply.id, "reply committed");
                console.finish_reply(&reply, session.is_streaming(), OffsetDateTime::now_utc())?;
            }
            Err(error) => {
                tracing::error!(%error, "send failed");
                eprintln!("error: {error}");
            }
        }
    }
}

/// `Mon, 02 Jan 2006 15:04:05 UTC`.
#[must_use]
pub fn rfc1123(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] UTC"
    ))
    .unwrap_or_default()
}

/// Session output written to a terminal-like stream.
///
/// Streamed deltas go out as they arrive; a whole reply is printed by
/// [`ConsoleSink::finish_reply`] once the send completes.
#[derive(Debug)]
pub struct ConsoleSink<W> {
    out: W,
}

/// Console on the process stdout.
pub type StdoutSink = ConsoleSink<io::Stdout>;

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn write(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    /// Close out a completed send. Streamed content is already on screen
    /// and only gets a separator; a whole reply is printed as
    /// `[id]\n<date>\n\n<content>\n\n`.
    pub fn finish_reply(
        &mut self,
        reply: &Message,
        streamed: bool,
        at: OffsetDateTime,
    ) -> io::Result<()> {
        if streamed {
            return self.write("\n\n");
        }
        self.write(&format!(
            "[{}]\n{}\n\n{}\n\n",
            reply.id.as_deref().unwrap_or_default(),
            rfc1123(at),
            reply.content
        ))
    }
}

impl<W: Write> TranscriptSink for ConsoleSink<W> {
    fn replace(&mut self, text: &str) {
        if let Err(error) = self.write(text) {
            tracing::warn!(%error, "failed to write transcript");
        }
    }

    fn append(&mut self, delta: &str) {
        if let Err(error) = self.write(delta) {
            tracing::warn!(%error, "failed to write reply delta");
        }
    }
}
