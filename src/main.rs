use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wicket::config::Config;
use wicket::dispatch;
use wicket::server::Server;
use wicket::storage::{FilePersistence, file_storage_handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::load()?;

    let persistence = FilePersistence::new(&cfg.storage.root);
    let handlers = file_storage_handlers(&persistence);
    let dispatcher = dispatch::build(&cfg.dispatch, &cfg.handlers, handlers)
        .context("wiring request handlers")?;

    let server = Server::start(&cfg, dispatcher)?;
    tracing::info!(addr = %server.local_addr(), root = %persistence.root().display(), "Server started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tokio::task::spawn_blocking(move || server.shutdown()).await?;

    Ok(())
}
