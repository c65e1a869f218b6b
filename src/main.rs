//! Battleships backend entrypoint wiring configuration, storage, REST and the move stream.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battleships_back::{
    config::{AppConfig, StoreBackend},
    dao::game_store::{GameStore, memory::MemoryGameStore},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    // Storage is opened once; failing to reach it is fatal.
    let store = connect_store(config.store)
        .await
        .with_context(|| format!("opening `{}` storage backend", config.store))?;
    info!(store = %config.store, "storage backend ready");

    let app_state = AppState::new(store);
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

async fn connect_store(backend: StoreBackend) -> anyhow::Result<Arc<dyn GameStore>> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryGameStore::new())),
        StoreBackend::Mongo => connect_mongo().await,
        StoreBackend::Couch => connect_couch().await,
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> anyhow::Result<Arc<dyn GameStore>> {
    use battleships_back::dao::game_store::mongodb::{MongoConfig, MongoGameStore};

    let config = MongoConfig::from_env()
        .await
        .context("reading MongoDB configuration")?;
    let store = MongoGameStore::connect(config)
        .await
        .context("connecting to MongoDB")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongo-store"))]
async fn connect_mongo() -> anyhow::Result<Arc<dyn GameStore>> {
    anyhow::bail!("this binary was built without the `mongo-store` feature")
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> anyhow::Result<Arc<dyn GameStore>> {
    use battleships_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};

    let store = CouchGameStore::connect(CouchConfig::from_env())
        .await
        .context("connecting to CouchDB")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "couch-store"))]
async fn connect_couch() -> anyhow::Result<Arc<dyn GameStore>> {
    anyhow::bail!("this binary was built without the `couch-store` feature")
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
