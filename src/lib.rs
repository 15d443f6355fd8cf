//! Terminal chat client built on `chat_session`.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::{rfc1123, Cli, ConsoleSink, StdoutSink};
pub use config::{AppConfig, ConfigError};
