//! RateBridge Server Binary
//!
//! Wires the resolver, gateway, store and refresh pipeline together and
//! serves the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratebridge_resolver::{
    ChannelRefreshQueue, LogPublisher, RateGateway, RatePublisher, RateResolver, RateStore,
    RefreshApplier, RefreshDispatcher, RefreshWorker, ResolveOptions, ResolverMetrics,
};
use ratebridge_server::{router, AppState, GatewayKind, ServerConfig};
use ratebridge_store::{CachedRateStore, MemoryRateStore, PostgresRateStore};
use ratebridge_upstream::{AlphaVantageGateway, StubGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting RateBridge server");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let gateway: Arc<dyn RateGateway> = match config.gateway {
        GatewayKind::AlphaVantage => {
            info!("Using the Alpha Vantage gateway");
            Arc::new(AlphaVantageGateway::new(config.alpha_vantage.clone())?)
        }
        GatewayKind::Stub => {
            info!("Using the stub gateway");
            Arc::new(StubGateway::new())
        }
    };

    let store: Arc<dyn RateStore> = match &config.database_url {
        Some(url) => {
            let postgres = PostgresRateStore::connect(url, config.db_max_connections).await?;
            postgres.ensure_schema().await?;
            Arc::new(postgres)
        }
        None => {
            info!("No database configured, keeping rates in memory");
            Arc::new(MemoryRateStore::new())
        }
    };
    let store: Arc<dyn RateStore> = if config.cache_enabled {
        info!("Rate store cache enabled");
        Arc::new(CachedRateStore::new(store))
    } else {
        store
    };

    let metrics = Arc::new(ResolverMetrics::new());
    let publisher: Arc<dyn RatePublisher> = Arc::new(LogPublisher);

    // Refresh pipeline: resolver dispatches, the worker persists and
    // notifies off the request path.
    let (queue, jobs) = ChannelRefreshQueue::unbounded();
    let dispatcher = RefreshDispatcher::new(Arc::new(queue), metrics.clone());
    let applier = RefreshApplier::new(store.clone(), publisher, metrics.clone());
    let worker = tokio::spawn(RefreshWorker::new(jobs, Arc::new(applier)).run());

    let resolver = Arc::new(RateResolver::new(gateway, store, dispatcher, metrics.clone()));

    let options = ResolveOptions {
        strategy: config.strategy,
        expiration_minutes: config.expiration_minutes,
    };
    let state = AppState {
        resolver,
        options: Arc::new(RwLock::new(options)),
        metrics,
    };
    let app = router(state, Duration::from_secs(config.request_timeout_seconds));

    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        strategy = %options.strategy,
        expiration_minutes = options.expiration_minutes,
        "RateBridge server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Serving is done and the router is gone, which releases the last
    // queue sender. The worker drains whatever was still queued and exits.
    worker.await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!(error = %err, "Failed to listen for shutdown signal"),
    }
}
