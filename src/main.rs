use std::io;

use chat_session::unix_now;
use chatline::{logging, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let log_file = logging::init(&cli.log_dir, unix_now())?;
    tracing::info!(path = %log_file.display(), "logging to file");

    cli.run().await
}
