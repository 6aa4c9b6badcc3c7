use anyhow::Result;
use axum::serve;
use server::{middleware, router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tally_core::chat::{ChatProvider, OpenAiCompatProvider};
use tally_core::config::AppConfig;
use tally_core::ingest::{DatasetService, HttpSheetSource};
use tally_core::service::ReportService;
use tokio::{signal, sync::broadcast};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,tally_core={level},server={level}",
            level = config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(false))
            .init();
    }
}

/// Spawns the periodic sweep for leaked in-flight registrations.
///
/// Settled flights deregister themselves; this task only bounds memory
/// against a computation that never settles. Shuts down when the broadcast
/// signal fires.
fn start_flight_sweeper(
    service: Arc<ReportService>,
    config: &AppConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let sweep_interval = config.cache.sweep_interval();
    let max_age = config.cache.flight_max_age();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("flight sweeper received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    let removed = service.purge_stale_flights(max_age);
                    if removed > 0 {
                        info!(removed = removed, "flight sweeper dropped stale registrations");
                    }
                }
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, starting graceful shutdown");
}

/// Builds the application router with the shared tower layers applied.
fn create_app(state: AppState, config: &AppConfig) -> axum::Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();

    router::create_router(state)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        // 1 MiB request bodies are more than any chat payload needs.
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(CompressionLayer::new())
        // Layers run in reverse order, so propagate runs after set.
        .layer(propagate_request_id)
        .layer(set_request_id)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("configuration invalid: {e}"))?;

    init_logging(&config);
    info!(environment = %config.environment, "starting tally reporting backend");
    debug!(
        orders_url = %config.source.orders_url,
        report_ttl_minutes = config.cache.report_ttl_minutes,
        chat_enabled = config.chat.enabled,
        "configuration loaded"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let source = Arc::new(
        HttpSheetSource::new(config.source.clone())
            .map_err(|e| anyhow::anyhow!("sheet source initialization failed: {e}"))?,
    );
    let datasets = DatasetService::new(source, &config.cache);
    let service = Arc::new(ReportService::new(datasets, &config));

    let chat: Option<Arc<dyn ChatProvider>> = OpenAiCompatProvider::from_config(&config.chat)
        .map_err(|e| anyhow::anyhow!("chat provider initialization failed: {e}"))?
        .map(|provider| Arc::new(provider) as Arc<dyn ChatProvider>);

    start_flight_sweeper(Arc::clone(&service), &config, shutdown_tx.subscribe());

    let config = Arc::new(config);
    let state = AppState::new(service, chat, Arc::clone(&config));
    let app = create_app(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.bind_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;
    info!(address = %addr, "report server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error occurred");
    }

    let _ = shutdown_tx.send(());
    info!("server shutdown complete");
    Ok(())
}
