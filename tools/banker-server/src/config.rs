//! Server configuration from the environment
//!
//! | Variable                       | Default     |
//! |--------------------------------|-------------|
//! | `BANKER_HOST`                  | `127.0.0.1` |
//! | `PORT`                         | `5000`      |
//! | `BANKER_RR_ITERATION_LIMIT`    | `1024`      |
//! | `BANKER_STARVATION_THRESHOLD`  | `100`       |
//! | `BANKER_MAX_SESSIONS`          | `256`       |
//!
//! A value that fails to parse is logged and replaced by its default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use banker_service::EngineConfig;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_sessions: usize,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: parse_or(&lookup, "BANKER_HOST", defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            max_sessions: parse_or(&lookup, "BANKER_MAX_SESSIONS", defaults.max_sessions),
            engine: EngineConfig {
                round_robin_iteration_limit: parse_or(
                    &lookup,
                    "BANKER_RR_ITERATION_LIMIT",
                    defaults.engine.round_robin_iteration_limit,
                ),
                starvation_threshold: parse_or(
                    &lookup,
                    "BANKER_STARVATION_THRESHOLD",
                    defaults.engine.starvation_threshold,
                ),
                ..defaults.engine
            },
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default = %default, "Ignoring malformed setting");
                default
            }
        },
    }
}
