//! CinderKV Server Binary
//!
//! Replays the AOF and starts the TCP server.

use std::sync::Arc;
use std::thread;

use clap::{Parser, ValueEnum};
use cinderkv::network::{Server, ShutdownHandle};
use cinderkv::{Config, Engine, FsyncPolicy};
use tracing_subscriber::{fmt, EnvFilter};

/// CinderKV Server
#[derive(Parser, Debug)]
#[command(name = "cinderkv-server")]
#[command(about = "In-memory key-value and hash store with append-only file durability")]
#[command(version)]
struct Args {
    /// Append-only file path
    #[arg(short, long, default_value = "database.aof")]
    aof: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// When to fsync the AOF
    #[arg(short, long, value_enum, default_value = "everysec")]
    fsync: Fsync,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Fsync {
    Always,
    Everysec,
    No,
}

impl From<Fsync> for FsyncPolicy {
    fn from(fsync: Fsync) -> Self {
        match fsync {
            Fsync::Always => FsyncPolicy::Always,
            Fsync::Everysec => FsyncPolicy::EVERY_SECOND,
            Fsync::No => FsyncPolicy::Never,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cinderkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("CinderKV Server v{}", cinderkv::VERSION);
    tracing::info!("AOF path: {}", args.aof);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .aof_path(&args.aof)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .fsync_policy(args.fsync.into())
        .build();

    // Open engine (replays the AOF before any client is accepted)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Engine initialized: {} keys, {} hashes",
        engine.store().key_count(),
        engine.store().hash_count()
    );

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    if let Err(e) = ctrlc_handler(server.shutdown_handle()) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close AOF: {}", e);
    }

    tracing::info!("Server stopped");
}

/// Stop the accept loop on Ctrl+C
///
/// The signal is awaited on a small single-threaded runtime of its own; the
/// server itself stays on plain threads.
fn ctrlc_handler(shutdown: ShutdownHandle) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Received Ctrl+C, initiating shutdown...");
                        shutdown.shutdown();
                    }
                    Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
                }
            })
        })?;

    Ok(())
}
