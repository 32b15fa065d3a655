use std::sync::Arc;

use tokio::signal;
use tracing::info;
use warp::Filter;

use classroom_sfu::hub::Hub;
use classroom_sfu::metrics::register_metrics;
use classroom_sfu::sfu_service::{signaling_route, SfuService};
use classroom_sfu::{config, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Validate environment variables before starting the server
    let cfg = config::validate_env().unwrap_or_else(|e| {
        eprintln!("Environment validation failed: {}", e);
        std::process::exit(1);
    });

    // Initialize tracing with validated RUST_LOG
    logging::init(&cfg.rust_log);

    // Initialize Metrics
    register_metrics();

    let hub = Arc::new(Hub::new());
    let service = SfuService::new(hub.clone(), Arc::new(cfg.clone()));

    let ws_route = signaling_route(service);

    let metrics_route = warp::path("metrics").and(warp::get()).map(|| {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = vec![];
        let metric_families = prometheus::gather();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    });

    let health_route = warp::path("healthz").and(warp::get()).map(|| "ok");

    let routes = ws_route.or(metrics_route).or(health_route);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.signaling_port).into();
    info!("SFU server listening on {}", addr);

    // Serve until CTRL+C, then drain active peer connections
    let (_, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        }
        info!("Received shutdown signal (SIGINT/SIGTERM)");
    });
    server.await;

    // Shutdown sequence
    info!("Shutting down SFU - closing active peer connections...");
    hub.shutdown().await;
    info!("SFU shutdown complete");

    Ok(())
}
