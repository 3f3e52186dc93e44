//! Trackstream service binary.
//!
//! Wires the path source, the position ticker, and the stream server
//! together, then runs until the operator presses ENTER or sends Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `trackstream-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Obtain the path network (fatal on failure, before listening)
//! 4. Seed the simulator
//! 5. Start the stream server
//! 6. Start the ticker
//! 7. Wait for the operator, then stop both

mod error;
mod hub_sink;
mod source;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use trackstream_core::config::LoggingConfig;
use trackstream_core::{StreamControl, StreamService, TrackstreamConfig, run_ticker};
use trackstream_server::{AppState, ServerConfig, spawn_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::hub_sink::HubSink;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "trackstream-config.yaml";

/// How long the ticker and server may take to wind down after a stop.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the path network, or the listener
/// cannot be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("trackstream-engine starting");
    info!(
        from_file,
        port = config.server.port,
        tracked_assets = config.stream.tracked_assets,
        page_size = config.stream.page_size,
        distance_step = config.stream.distance_step,
        extrude_polygons = config.stream.extrude_polygons,
        broadcast_interval_ms = config.stream.broadcast_interval_ms,
        max_buffered_bytes = config.stream.max_buffered_bytes,
        "Configuration loaded"
    );

    // 3. Obtain the path network.
    let network = source::load_network(&config.source)
        .await
        .map_err(EngineError::from)?;

    // 4. Seed the simulator.
    let mut service = StreamService::new(config.stream.clone(), network);
    info!(
        slots = service.slot_count(),
        pages_per_cycle = service.pages_per_cycle(),
        "Simulator seeded"
    );

    // 5. Start the stream server.
    let control = Arc::new(StreamControl::new(config.stream.broadcast_interval_ms));
    let app_state = Arc::new(AppState::new(
        config.stream.max_buffered_bytes,
        Arc::clone(&control),
    ));
    let (server_handle, addr) =
        spawn_server(&ServerConfig::from(&config.server), Arc::clone(&app_state))
            .await
            .map_err(EngineError::from)?;
    info!(%addr, "Started listening");

    // 6. Start the ticker.
    let ticker_control = Arc::clone(&control);
    let hub = Arc::clone(&app_state.hub);
    let ticker_handle = tokio::spawn(async move {
        let mut sink = HubSink::new(hub);
        run_ticker(&mut service, &ticker_control, &mut sink).await
    });

    // 7. Wait for the operator.
    println!("Press ENTER to stop server");
    wait_for_operator().await;
    info!("Closing server");
    control.request_stop();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, ticker_handle).await {
        Ok(Ok(result)) => info!(
            ticks = result.ticks,
            encode_failures = result.encode_failures,
            "Ticker stopped"
        ),
        Ok(Err(e)) => warn!(error = %e, "Ticker task failed"),
        Err(_) => warn!("Ticker did not stop in time"),
    }
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, server_handle).await.is_err() {
        warn!("Server did not stop in time");
    }

    info!(
        ticks_broadcast = control.ticks_broadcast(),
        elapsed_seconds = control.elapsed_seconds(),
        "trackstream-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_FILE`], falling back to defaults.
///
/// Environment overrides apply either way. Returns whether the file was found.
fn load_config() -> Result<(TrackstreamConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        return Ok((TrackstreamConfig::from_file(config_path)?, true));
    }
    let mut config = TrackstreamConfig::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok((config, false))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Resolve when the operator presses ENTER or sends Ctrl-C.
///
/// A closed stdin (e.g. running detached) leaves Ctrl-C as the only trigger.
async fn wait_for_operator() {
    let enter = async {
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(n) if n > 0 => info!("ENTER pressed"),
            Ok(_) => std::future::pending::<()>().await,
            Err(e) => {
                warn!(error = %e, "Cannot read stdin, waiting for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C, waiting for ENTER");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = enter => {}
        () = ctrl_c => {}
    }
}
