use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use control_plane::config::Config;
use control_plane::services::PublishService;
use control_plane::{build_router, db, AppState};
use objectstore::ObjectStoreClient;
use publisher::Publisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "control_plane=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("configuration loaded");

    let pool = db::connect(&config).await?;
    tracing::info!("database connection established");

    let objects = ObjectStoreClient::new(config.object_store_config()).await;
    let publisher = Publisher::new(pool.clone(), objects);
    let publish = PublishService::new(pool.clone(), publisher);

    let state = AppState { pool, publish };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(%addr, "starting control-plane server");

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
