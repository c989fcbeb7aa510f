use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use decision_service::config::Config;
use decision_service::config_store::ConfigStore;
use decision_service::{build_router, AppState};
use objectstore::ObjectStoreClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "decision_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("configuration loaded");

    let objects = ObjectStoreClient::new(config.object_store.clone()).await;
    let store = ConfigStore::new(objects);

    for environment in &config.initial_environments {
        match store.load(environment).await {
            Ok(()) => tracing::info!(environment, "pre-registered environment loaded"),
            Err(err) => tracing::warn!(environment, error = %err, "failed to load pre-registered environment at startup"),
        }
    }

    let (_shutdown_tx, _poll_handle) = store
        .clone()
        .spawn(config.initial_environments.clone(), config.poll_interval);

    let state = AppState { store };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!(%addr, "starting decision service");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    tracing::info!("shutdown signal received");
}
