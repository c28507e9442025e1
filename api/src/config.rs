use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Server settings read from the environment (`HOST`, `PORT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Invalid values are logged and replaced by their defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("PORT") {
            Some(port_str) => match port_str.parse::<u16>() {
                Ok(port_num) => {
                    info!("Using port {} from environment variable PORT.", port_num);
                    port_num
                }
                Err(_) => {
                    warn!(
                        "Invalid PORT value '{}' in environment variable. Using default port {}.",
                        port_str, DEFAULT_PORT
                    );
                    DEFAULT_PORT
                }
            },
            None => {
                info!(
                    "PORT environment variable not set. Using default port {}.",
                    DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        };

        let host = match lookup("HOST") {
            Some(host_str) => host_str.parse::<IpAddr>().unwrap_or_else(|_| {
                warn!(
                    "Invalid HOST value '{}' in environment variable. Using default host {}.",
                    host_str, DEFAULT_HOST
                );
                DEFAULT_HOST
            }),
            None => DEFAULT_HOST,
        };

        Self { host, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
