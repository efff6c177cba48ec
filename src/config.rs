//! Server configuration from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 7667;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory the static application shell is served from
    pub static_dir: String,
}

impl ServerConfig {
    /// Load config from `BIND_HOST`, `PORT` and `STATIC_DIR`, with
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let host: IpAddr = std::env::var("BIND_HOST")
            .ok()
            .and_then(|h| h.trim().parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let port = match std::env::var("PORT") {
            Ok(raw) => match raw.trim().parse() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!("Invalid PORT value {:?}, using {}", raw, DEFAULT_PORT);
                    DEFAULT_PORT
                }
            },
            Err(_) => DEFAULT_PORT,
        };

        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "static".to_string());

        Self {
            bind_addr: SocketAddr::new(host, port),
            static_dir,
        }
    }
}
