use std::path::Path;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use taskview_metadata::MetadataClient;

use crate::config::Config;
use crate::error::Result;
use crate::pages::{self, AppState};

/// Assembles the application router: the status page at `/`, everything else
/// falling through to the public asset directory.
pub fn router(state: Arc<AppState>, public_dir: &Path) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the status page with the provided configuration.
pub async fn serve(config: Config) -> Result<()> {
    let templates = pages::templates()?;
    let client = MetadataClient::new(config.metadata_endpoint.clone());
    let state = Arc::new(AppState { client, templates });
    let app = router(state, &config.public_dir);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, mode = ?config.mode, "taskview listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future()
        .await?;

    Ok(())
}

/// Loads configuration from the environment and starts serving.
pub async fn run() -> Result<()> {
    let config = Config::from_env()?;
    serve(config).await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
