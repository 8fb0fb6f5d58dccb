//! Console client for the noughts game server.
//!
//! Signs in, lists open games, and plays matches from the terminal. Settings
//! come from flags, then `NOUGHTS_*` environment variables, then defaults (see
//! [`config`]).

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod app;
mod config;
mod console;

#[derive(Parser)]
#[command(name = "noughts", about = "Play noughts and crosses against other players")]
struct Cli {
    /// Server address as host:port.
    #[arg(short, long)]
    server: Option<String>,

    /// Name to sign in with.
    #[arg(short, long)]
    name: Option<String>,

    /// Directory for daily rolling log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::Config::resolve(cli.server, cli.name, cli.log_dir);

    // stdout belongs to the game, so logs go to a file.
    std::fs::create_dir_all(&config.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "noughts-client");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(server = %config.server_addr, "Noughts client starting up");
    app::run(config).await?;
    tracing::info!("Noughts client shutting down");
    Ok(())
}
