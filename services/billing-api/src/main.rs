//! TradieMate Billing API server

use std::net::SocketAddr;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use billing_api::{build_router, scheduler, AppState, Config};
use tradie_db::Repositories;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("billing_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TradieMate Billing API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        scheduler = config.scheduler.enabled,
        stripe_prices = config.billing.price_tiers.len(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool and apply migrations
    let pool = tradie_db::create_pool(&config.database_url).await?;
    tradie_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created, migrations applied");

    let repos = Repositories::new(pool.clone());
    let state = AppState::new(repos, pool, config.clone())?;

    let scheduler = config
        .scheduler
        .enabled
        .then(|| scheduler::spawn(state.clone()));

    let app = build_router(state, metrics_handle);
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));

    tracing::info!("HTTP server listening on {}", http_addr);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Usage checks sit on the request path of every gated action
    let billing_latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("billing_operation_duration_seconds".to_string()),
            billing_latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "billing_usage_checks_total",
        "Usage checks by usage type and outcome"
    );
    metrics::describe_counter!(
        "billing_usage_denied_total",
        "Actions denied for quota by usage type"
    );
    metrics::describe_counter!(
        "billing_webhooks_processed_total",
        "Webhooks processed by source and result"
    );
    metrics::describe_counter!(
        "billing_recurring_invoices_total",
        "Recurring templates processed by status"
    );
    metrics::describe_histogram!(
        "billing_operation_duration_seconds",
        "Billing operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
