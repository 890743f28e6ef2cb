/// Server Configuration
///
/// Configuration is read once from environment variables at startup. Every
/// value has a default so the server runs with no environment at all, which is
/// how MCP clients usually spawn it.

/// Default `serverInfo.name` reported during `initialize`.
pub const DEFAULT_SERVER_NAME: &str = "Demo";

/// Server metadata reported to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server name as reported in MCP initialize responses
    pub name: String,
    /// Server version string as reported in MCP initialize responses
    pub version: String,
}

impl ServerConfig {
    /// Load configuration from `SERVER_NAME` and `SERVER_VERSION`.
    pub fn from_env() -> Self {
        Self {
            name: get_env_var("SERVER_NAME", DEFAULT_SERVER_NAME),
            version: get_env_var("SERVER_VERSION", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Get environment variable value with a default fallback.
///
/// Unset and non-UTF-8 values both fall back to `default`.
pub fn get_env_var(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
