use item_dashboard::{AppState, Config, router, source};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    if config.source.requires_request_signing() {
        warn!(
            "the scan endpoint is hosted by AWS and needs SigV4 signed requests; \
             set DASHBOARD_ENDPOINT to a signing gateway or DynamoDB Local, \
             otherwise every report will be empty"
        );
    }
    let source = source::from_config(&config.source)?;
    info!("reading records from {}", source.describe());

    let app = router(AppState::new(source, config.schema));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
