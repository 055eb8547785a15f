use clap::Parser;
use leads_gateway::{router, AppState, CacheStore, Config, MemoryCache};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();

    // RUST_LOG wins over the debug flag
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_level())),
        )
        .init();

    info!("Starting streamer leads gateway");

    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
    let state = Arc::new(AppState::new(&config, cache));

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Listening on {}, upstream {}", config.bind_addr(), config.app_server_url);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    info!("Shutting down");
    Ok(())
}
