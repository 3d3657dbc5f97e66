use aesd_logging::SubscriberBuilder;
use aesd_socket::{Cli, Server};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    let _guard = SubscriberBuilder::new()
        .with_config(config.log.clone())
        .init()?;

    let server = Server::bind(config).await?;
    let released = server.run().await?;
    info!(released, "aesdsocket stopped");
    Ok(())
}
