//! Listen-together relay server
//!
//! Run with: cargo run --example relay_server -- [OPTIONS]
//!
//! Examples:
//!   cargo run --example relay_server                          # binds to 0.0.0.0:8080
//!   cargo run --example relay_server -- --bind 127.0.0.1:9000
//!   JAM_MAX_CONNECTIONS=100 cargo run --example relay_server
//!
//! ## Talking to it
//!
//! Every frame is one JSON object per line:
//!
//! ```text
//! $ nc localhost 8080
//! {"event":"announce","data":{"name":"Alice"}}
//! {"event":"presence-list","data":[{"id":1,"name":"Alice"}]}
//! {"event":"state-update","data":{"state":{"playing":true,"currentTime":0}}}
//! ```
//!
//! A second client sends `{"event":"follow","data":{"targetHostId":1}}` to
//! start mirroring Alice's playback.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use jam_relay::{RelayConfig, RelayServer, ServerConfig};

/// Listen-together relay server
#[derive(Parser, Debug)]
#[command(name = "relay_server")]
#[command(about = "Presence, host following and playback state relay")]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "JAM_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "JAM_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Seconds without a frame before a client is dropped
    #[arg(long, env = "JAM_IDLE_TIMEOUT_SECS", default_value_t = 120)]
    idle_timeout_secs: u64,

    /// Name shown for clients that never announced one
    #[arg(long, default_value = "guest")]
    default_name: String,

    /// Advance snapshot positions by the time elapsed since the last update
    #[arg(long)]
    extrapolate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jam_relay=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let relay = RelayConfig::default()
        .default_name(args.default_name)
        .extrapolate_sync_position(args.extrapolate);

    let config = ServerConfig::with_addr(args.bind)
        .max_connections(args.max_connections)
        .idle_timeout(Duration::from_secs(args.idle_timeout_secs))
        .relay(relay);

    println!("Starting relay server on {}", config.bind_addr);

    let server = RelayServer::new(config);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for Ctrl+C: {}", e);
        }
        println!("\nShutting down...");
    };

    if let Err(e) = server.run_until(shutdown).await {
        eprintln!("Server error: {}", e);
    }

    Ok(())
}
