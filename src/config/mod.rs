use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use log::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_FRONT_PAGE: &str = "FrontPage";

/// Application configuration and constants
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: Arc<PathBuf>,
    pub templates_dir: Arc<PathBuf>,
    pub front_page: String,
    pub port: u16,
    pub host: String,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            data_dir: Arc::new(PathBuf::from("data")),
            templates_dir: Arc::new(PathBuf::from("templates")),
            front_page: DEFAULT_FRONT_PAGE.to_string(),
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
        }
    }

    /// Create configuration with custom values
    pub fn with_custom(
        data_dir: PathBuf,
        templates_dir: PathBuf,
        front_page: Option<String>,
        port: Option<u16>,
        host: Option<String>,
    ) -> Self {
        Self {
            data_dir: Arc::new(data_dir),
            templates_dir: Arc::new(templates_dir),
            front_page: front_page.unwrap_or_else(|| DEFAULT_FRONT_PAGE.to_string()),
            port: port.unwrap_or(DEFAULT_PORT),
            host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        }
    }

    /// Defaults overridden by `PAGEWIKI_*` environment variables
    pub fn from_env() -> Self {
        let port = match std::env::var("PAGEWIKI_PORT") {
            Ok(raw) => match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!("Ignoring invalid PAGEWIKI_PORT {:?}, using {}", raw, DEFAULT_PORT);
                    None
                }
            },
            Err(_) => None,
        };

        Self::with_custom(
            std::env::var("PAGEWIKI_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("data")),
            std::env::var("PAGEWIKI_TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("templates")),
            std::env::var("PAGEWIKI_FRONT_PAGE").ok().filter(|t| !t.is_empty()),
            port,
            std::env::var("PAGEWIKI_HOST").ok(),
        )
    }

    /// Get the socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self.host.parse::<IpAddr>().unwrap_or_else(|_| {
            warn!("Invalid host {:?}, binding to {}", self.host, DEFAULT_HOST);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        SocketAddr::new(ip, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
