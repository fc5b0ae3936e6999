//! Log server binary
//!
//! Hosts a ring of recent messages and serves the write/query protocol over
//! HTTP until interrupted.

use std::sync::Arc;

use clap::Parser;
use dmxp_logrelay::Server::ring_buffer::DEFAULT_CAPACITY;
use dmxp_logrelay::Server::http::DEFAULT_PORT;
use dmxp_logrelay::Server::{HttpLogServer, LogService, ServerRingBuffer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Log relay server", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value_t = format!("0.0.0.0:{DEFAULT_PORT}"))]
    bind: String,

    /// Number of messages kept in memory
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let ring = Arc::new(ServerRingBuffer::with_capacity(args.capacity)?);
    let service: Arc<dyn LogService> = ring.clone();
    let mut server = match HttpLogServer::bind(args.bind.as_str(), service) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind {}: {}", args.bind, e);
            return Err(e.into());
        }
    };

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    info!(
        "serving on {} with capacity {}, press Ctrl+C to stop",
        server.local_addr(),
        ring.capacity()
    );
    let _ = stop_rx.recv();

    info!("shutting down with {} messages stored", ring.len());
    server.shutdown();
    Ok(())
}
