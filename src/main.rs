//! Bridge Relay binary
//!
//! Loads configuration, verifies the configured endpoints and serves the
//! HTTP API until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Instant;

use bridge_relay::{
    address::AddressConverter,
    api::{self, AppState, HealthInfo, RateLimit},
    metrics, preflight, ComposerConfig, Config, RestClientFactory, TransactionComposer,
};
use eyre::WrapErr;
use tracing::info;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    // LOG_FORMAT and RUST_LOG may come from .env
    dotenvy::dotenv().ok();
    init_logging();

    info!("Starting Bridge Relay");

    let config = Config::load()?;
    info!(
        cosmos_chain_id = %config.cosmos.chain_id,
        evm_chain_id = config.evm.chain_id,
        rest_url = %config.cosmos.rest_url,
        channel = %config.bridge.source_channel,
        "Configuration loaded"
    );

    if config.server.skip_preflight {
        info!("Skipping preflight checks");
    } else {
        preflight::run(&config).await?;
    }

    let factory = Arc::new(RestClientFactory::new(config.chain_settings()));
    let composer = Arc::new(TransactionComposer::new(
        ComposerConfig::from_config(&config),
        factory,
    ));
    let state = AppState::new(
        composer,
        AddressConverter::new(config.bridge.destination_prefix.clone()),
        HealthInfo {
            cosmos_chain_id: config.cosmos.chain_id.clone(),
            evm_chain_id: config.evm.chain_id,
            started_at: Instant::now(),
        },
    );

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    metrics::UP.set(1.0);

    api::serve(
        listener,
        state,
        RateLimit {
            per_second: config.server.rate_limit_per_second,
            burst: config.server.rate_limit_burst,
        },
        wait_for_shutdown_signal(),
    )
    .await?;

    metrics::UP.set(0.0);
    info!("Bridge Relay stopped");
    Ok(())
}

/// Initialize tracing; `LOG_FORMAT=json` switches to JSON lines
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_relay=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
