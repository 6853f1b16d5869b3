//! TOML configuration for the backends and the proxy started by the binary.
//!
//! Every section is optional; a missing section takes its default. The
//! defaults describe three backends on ports 3000, 4000 and 5000, routed from
//! `/a`, `/b` and `/c` by a proxy on port 6000.
//!
//! ```toml
//! [server]
//! backlog = 1024
//! reuse_address = true
//!
//! [connection]
//! read_buffer_size = 4096
//!
//! [[backends]]
//! port = 3000
//! greeting = "hello from a"
//!
//! [proxy]
//! port = 6000
//!
//! [[proxy.routes]]
//! target = "/a"
//! backend = "127.0.0.1:3000"
//! ```

use crate::limits::{ConnLimits, ServerLimits};
use serde::Deserialize;
use std::{collections::HashSet, fs, io, net::SocketAddr, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerLimits,
    pub connection: ConnLimits,
    pub backends: Vec<BackendConfig>,
    pub proxy: ProxyConfig,
}

/// A demo backend answering every request with a fixed greeting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub port: u16,
    pub greeting: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub port: u16,
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub target: String,
    pub backend: SocketAddr,
}

const CLASSIC: [(&str, u16); 3] = [("/a", 3000), ("/b", 4000), ("/c", 5000)];

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerLimits::default(),
            connection: ConnLimits::default(),
            backends: CLASSIC
                .iter()
                .map(|&(target, port)| BackendConfig {
                    port,
                    greeting: format!("hello from {}", target.trim_start_matches('/')),
                })
                .collect(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 6000,
            routes: CLASSIC
                .iter()
                .map(|&(target, port)| RouteConfig {
                    target: target.to_owned(),
                    backend: SocketAddr::from(([127, 0, 0, 1], port)),
                })
                .collect(),
        }
    }
}

impl Config {
    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.read_buffer_size == 0 {
            return Err(invalid("connection.read_buffer_size must be greater than zero"));
        }
        if self.server.backlog <= 0 {
            return Err(invalid("server.backlog must be greater than zero"));
        }

        let mut targets = HashSet::new();
        for route in &self.proxy.routes {
            if route.target.is_empty() || route.target.contains(char::is_whitespace) {
                return Err(invalid(format!(
                    "route target {:?} must be non-empty and contain no whitespace",
                    route.target
                )));
            }
            if !targets.insert(route.target.as_str()) {
                return Err(invalid(format!("duplicate route target {:?}", route.target)));
            }
        }

        let mut ports = HashSet::new();
        let all_ports = self
            .backends
            .iter()
            .map(|backend| backend.port)
            .chain([self.proxy.port]);
        for port in all_ports {
            if !ports.insert(port) {
                return Err(invalid(format!("port {port} is used twice")));
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[inline]
fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
