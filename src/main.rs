use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora::app::auth::AuthService;
use agora::config::{AppConfig, StoreBackend};
use agora::infra::{db::Db, memory::MemoryStore, postgres::PgStore};
use agora::{http, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let auth = AuthService::new(config.paseto_access_key, config.access_ttl_minutes);

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let db = Db::connect(&config).await?;
            if config.run_migrations {
                db.migrate().await?;
                tracing::info!("schema migrations applied");
            }
            let store = Arc::new(PgStore::new(db));
            AppState {
                store: store.clone(),
                notifications: store,
                auth,
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on shutdown");
            let store = Arc::new(MemoryStore::new());
            AppState {
                store: store.clone(),
                notifications: store,
                auth,
            }
        }
    };

    let app: Router = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(backend = ?config.store_backend, "listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
