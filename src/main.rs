use anyhow::{Context, Result};
use clap::Parser;
use loqa_voice::{create_router, Adapters, AppState, Bridge, Config};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "loqa-voice", about = "Real-time voice conversation bridge")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/loqa-voice")]
    config: String,

    /// Override the HTTP port from configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("Loqa Voice v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Segmentation: threshold={} chunks, timeout={}ms, vad={}",
        cfg.segmentation.chunk_threshold,
        cfg.segmentation.silence_timeout_ms,
        cfg.segmentation.vad.enabled
    );
    info!("Adapters: {:?}", cfg.adapters.kind);

    let adapters = Adapters::from_config(&cfg.adapters)?;
    let bridge = Arc::new(Bridge::from_config(&cfg, adapters));
    let app = create_router(AppState::new(Arc::clone(&bridge)));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    bridge.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
