//! heartbeat binary: parse flags, install logging, serve `/health` until
//! SIGTERM or Ctrl-C.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heartbeat::config::Cli;
use heartbeat::{Server, app};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(cli.log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.server_config();
    tracing::info!(
        host = %config.host,
        port = config.port,
        drain_timeout_secs = config.drain_timeout.as_secs(),
        "loaded configuration"
    );

    Server::new(config, app::router())
        .bind()
        .await?
        .serve()
        .await?;

    Ok(())
}
