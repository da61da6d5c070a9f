//! Webhook service that welcomes the authors of newly opened issues and pull requests
//! and points them at the SIG owning the repository.

pub mod configuration;
pub mod errors;
pub mod handler;
pub mod message;
pub mod newcomer;
pub mod platform;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::configuration::Settings;
use crate::handler::WelcomeHandler;
use crate::newcomer::HttpNewcomerStatistics;
use crate::platform::GithubPlatform;
use crate::routes::{router, AppState};

pub async fn run(settings: Settings) -> Result<()> {
    let github = Arc::new(GithubPlatform::new(&settings.github)?);
    let handler = WelcomeHandler::new(
        settings.config_items,
        github.clone(),
        github,
        Arc::new(HttpNewcomerStatistics::new()?),
    )?;

    let app = router(AppState::new(handler));
    let listener = TcpListener::bind(settings.server.address).await?;
    info!("listening on {}", settings.server.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
