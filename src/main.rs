use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use stitchtrack::config::AppConfig;
use stitchtrack::files::LocalDiskStore;
use stitchtrack::rest::{create_router, AppState};
use stitchtrack::storage::Storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stitchtrack=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    let storage = Storage::open(&config.data_dir)?;
    let files = LocalDiskStore::new(config.upload_dir.clone(), config.max_upload_bytes)?;

    let addr = config.http_addr;
    let state = AppState {
        storage,
        files: Arc::new(files),
        config: Arc::new(config),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}
