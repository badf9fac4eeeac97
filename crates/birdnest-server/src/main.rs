//! Birdnest server - no-fly zone violator monitor

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use birdnest_core::MonitorRules;
use birdnest_feed::BirdnestClient;
use birdnest_server::config::Config;
use birdnest_server::cycle::PollCycle;
use birdnest_server::state::AppState;
use birdnest_server::{api, loops, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("birdnest_server=debug")),
        )
        .init();

    tracing::info!("Starting Birdnest server...");

    let config = Config::from_env();
    let client = Arc::new(BirdnestClient::new(
        &config.drones_url,
        &config.pilots_url,
        config.http_timeout(),
    )?);
    let store = persistence::open_store(&config).await?;
    let rules = MonitorRules::default().with_retention_secs(config.retention_secs);

    let cycle = PollCycle::new(client.clone(), client, store, rules)
        .with_persist_attempts(config.persist_attempts);
    let state = Arc::new(AppState::new(cycle).with_refresh_on_view(config.refresh_on_view));
    state.load_view().await;

    let (shutdown_tx, _) = broadcast::channel(1);
    let poll_loop = tokio::spawn(loops::poll_loop::run_poll_loop(
        state.clone(),
        config.poll_interval(),
        shutdown_tx.subscribe(),
    ));

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(()).ok();
    poll_loop.await.ok();
    tracing::info!("Birdnest server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
