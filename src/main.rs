/// MCP Server Entry Point
///
/// Starts an MCP server exposing the `add` tool over STDIO. Logging goes to
/// stderr because stdout carries the JSON-RPC stream.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "Demo")
/// - SERVER_VERSION: Version string (default: the crate version)
/// - RUST_LOG: tracing filter (default: "info")

mod core;
mod tools;

use crate::core::config::ServerConfig;
use crate::core::server;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    if let Err(e) = server::run_server_stdio(config).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
