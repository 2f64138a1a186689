//! Command-line and environment configuration

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Rupture Explorer server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "rupture-explorer", version, about)]
pub struct Config {
    /// Path to the NSHM rupture database (SQLite), or a `sqlite:` connection string
    #[arg(long, env = "NSHMDB_PATH")]
    pub nshmdb_path: PathBuf,

    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub listen_addr: SocketAddr,

    /// Directory served under /static
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Maximum database connections
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,

    /// Maximum ruptures returned by a query
    #[arg(long, env = "RESULT_LIMIT", default_value_t = 100)]
    pub result_limit: u32,

    /// Number of ruptures kept in the in-memory cache
    #[arg(long, env = "CACHE_CAPACITY", default_value_t = 1024)]
    pub cache_capacity: usize,
}

impl Config {
    /// The database location when given as a connection string rather than a path
    pub fn connection_string(&self) -> Option<&str> {
        self.nshmdb_path
            .to_str()
            .filter(|location| location.starts_with("sqlite:"))
    }
}
