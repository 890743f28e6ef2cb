/// Core Server Framework Module
///
/// - config.rs: environment-driven server configuration
/// - error.rs: error type shared by the transport and the tools
/// - server.rs: MCP protocol types, tool registry and the STDIO transport

pub mod config;
pub mod error;
pub mod server;
