use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use medlens_backend::{
    app, config, logging,
    pipeline::Pipeline,
    services::{HttpInferenceClient, InferenceClient, ResilientClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting MedLens backend"
    );

    // Cancelled on shutdown so in-flight provider calls stop waiting
    let shutdown = CancellationToken::new();

    let http_client = HttpInferenceClient::new(&settings.inference)?;
    let client: Arc<dyn InferenceClient> = Arc::new(ResilientClient::from_settings(
        Arc::new(http_client),
        &settings.inference,
        shutdown.clone(),
    ));

    // Non-blocking provider check
    tokio::spawn({
        let client = client.clone();
        async move {
            match client.health_check().await {
                Ok(()) => tracing::info!("Inference provider is reachable"),
                Err(e) => tracing::warn!(error = %e, "Inference provider health check failed"),
            }
        }
    });

    let pipeline = Pipeline::new(client, settings.fallback);
    let state = app::AppState::new(settings.clone(), pipeline);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
