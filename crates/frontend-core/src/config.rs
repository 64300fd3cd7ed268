use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::errors::ConfigError;

pub const DEFAULT_SERVICE_NAME: &str = "FRONTEND";
pub const DEFAULT_HOST_NAME: &str = "frontend-staging";
pub const DEFAULT_SERVICE_PORT: u16 = 3000;
pub const DEFAULT_REGISTRY_URL: &str = "http://eureka:8761";
pub const DEFAULT_LISTEN_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "build";

/// Identity this process advertises to the discovery registry.
///
/// Read once at startup; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryClientConfig {
    pub service_name: String,
    pub host_name: String,
    /// Port advertised in the instance descriptor. Not necessarily the
    /// port this process listens on.
    pub port: u16,
    pub registry_url: String,
}

impl RegistryClientConfig {
    pub fn new(
        service_name: impl Into<String>,
        host_name: impl Into<String>,
        port: u16,
        registry_url: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            host_name: host_name.into(),
            port,
            registry_url: registry_url.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Absent
    /// variables fall back to their defaults. Nothing here may keep the host
    /// from serving, so an unparseable `SERVICE_PORT` is logged and replaced
    /// by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_port(&lookup, "SERVICE_PORT", DEFAULT_SERVICE_PORT).unwrap_or_else(|e| {
            tracing::warn!("{}, advertising port {} instead", e, DEFAULT_SERVICE_PORT);
            DEFAULT_SERVICE_PORT
        });

        Self {
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            host_name: lookup("HOST_NAME").unwrap_or_else(|| DEFAULT_HOST_NAME.to_string()),
            port,
            registry_url: lookup("EUREKA_URL").unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
        }
    }
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_SERVICE_NAME,
            DEFAULT_HOST_NAME,
            DEFAULT_SERVICE_PORT,
            DEFAULT_REGISTRY_URL,
        )
    }
}

/// Listener settings for the host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Directory holding the pre-built single-page application.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidAddress {
                var: "BIND_ADDR",
                value: raw,
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Ok(Self {
            bind_addr,
            port: parse_port(&lookup, "PORT", DEFAULT_LISTEN_PORT)?,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn index_file(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }
}

fn parse_port<F>(lookup: &F, var: &'static str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        None => Ok(default),
    }
}
