//! linekv server entry point.
//!
//! Sets up logging, the shared store, the background expiry sweeper, and
//! the TCP accept loop. The listening address is fixed at build time;
//! there are no flags and no configuration files.

use linekv::commands::CommandHandler;
use linekv::connection::{handle_connection, ConnectionStats};
use linekv::storage::{start_expiry_sweeper, Store};
use linekv::{DEFAULT_HOST, DEFAULT_PORT};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("linekv v{} starting", linekv::VERSION);

    // One store, shared by every connection and the sweeper
    let store = Arc::new(Store::new());

    let _sweeper = start_expiry_sweeper(Arc::clone(&store));

    let stats = Arc::new(ConnectionStats::new());

    let bind_address = format!("{DEFAULT_HOST}:{DEFAULT_PORT}");
    let listener = TcpListener::bind(&bind_address).await?;
    info!("Listening on {}", bind_address);

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, store, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Accepts connections forever, one spawned task per client.
async fn accept_loop(listener: TcpListener, store: Arc<Store>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let commands = CommandHandler::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, commands, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
