//! hivestore backend server binary.
//!
//! Serves an in-memory wide-column store over TCP until SIGINT or SIGTERM.

use clap::Parser;
use hivestore_core::backend::MemoryStore;
use hivestore_core::config::DEFAULT_PORT;
use hivestore_server::{ColumnStoreServer, Transport};
use tracing::info;

/// Wide-column backend for the hivestore catalog.
#[derive(Parser, Debug)]
#[command(name = "hivestore-server", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Use length-prefixed framing instead of newline-delimited messages.
    #[arg(long)]
    framed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let transport = Transport::from_framed(cli.framed);

    info!(host = %cli.host, port = cli.port, ?transport, "starting");

    let server =
        ColumnStoreServer::bind((cli.host.as_str(), cli.port), MemoryStore::new(), transport)
            .await?;
    server.run().await?;

    info!("server stopped");
    Ok(())
}
