use clap::Parser;
use std::time::Duration;

/// Cache key the leads collection is stored under.
pub const LEADS_KEY: &str = "leads";
/// How long a fetched leads collection stays in the cache.
pub const LEADS_TTL: Duration = Duration::from_secs(600);
/// Upstream path serving the leads collection.
pub const STREAMER_PATH: &str = "/streamer";

/// Gateway settings, read from flags or the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "leads_gateway", about = "Streamer leads web gateway", version)]
pub struct Config {
    /// Base URL of the upstream API, without a trailing slash
    #[arg(long, env = "APP_SERVER_URL")]
    pub app_server_url: String,

    /// Static token sent verbatim in the Authorization header
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    pub token: String,

    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "PORT", default_value_t = 7000)]
    pub port: u16,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, env = "DEBUG")]
    pub debug: bool,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
