use std::sync::Arc;

use mock_server::{MockHttpServer, ServerConfig, ServerError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let provider = config.load_provider()?;
    let mut server = MockHttpServer::with_provider(Arc::new(provider));
    server.start(config.port).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.stop().await?;

    if let Err(err) = server.verify() {
        error!("{err}");
        return Err(err.into());
    }
    info!("all expectations met");
    Ok(())
}
