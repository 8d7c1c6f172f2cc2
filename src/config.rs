use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::sessions::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_POOL_LIMIT};

/// Port used when neither the environment nor the command line names one.
pub const DEFAULT_PORT: u16 = 24679;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Pairing broker and signaling relay over server-sent push channels")]
pub struct Cli {
    /// Port to listen on (overrides `PORT` / `SERVER_PORT`)
    pub port: Option<u16>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: IpAddr,
    pub server_port: u16,
    pub environment: Environment,
    pub log_level: String,
    pub frontend_url: String,
    pub client_dir: PathBuf,
    pub heartbeat_interval: Duration,
    pub pool_limit: usize,
}

/// Deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: IpAddr::from([127, 0, 0, 1]),
            server_port: DEFAULT_PORT,
            environment: Environment::Development,
            log_level: "info".to_string(),
            frontend_url: "http://localhost:3001".to_string(),
            client_dir: PathBuf::from("client"),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            pool_limit: DEFAULT_POOL_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present).
    ///
    /// All optional: `PORT` / `SERVER_PORT`, `SERVER_HOST`, `ENVIRONMENT`,
    /// `LOG_LEVEL`, `FRONTEND_URL`, `CLIENT_DIR`, `HEARTBEAT_INTERVAL_SECS`,
    /// `WAITING_POOL_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of them holds an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let environment = match lookup("ENVIRONMENT").as_deref() {
            Some("production") => Environment::Production,
            Some("staging") => Environment::Staging,
            _ => Environment::Development,
        };

        // PORT wins over SERVER_PORT, as on most PaaS hosts
        let server_port = match lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT / PORT must be a valid u16"))?,
            None => defaults.server_port,
        };

        // In production, listen on every interface
        let default_host = if environment == Environment::Production {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let server_host = lookup("SERVER_HOST")
            .unwrap_or_else(|| default_host.to_string())
            .parse::<IpAddr>()
            .map_err(|_| anyhow::anyhow!("SERVER_HOST must be a valid IP address"))?;

        let heartbeat_interval = match lookup("HEARTBEAT_INTERVAL_SECS") {
            Some(secs) => match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => anyhow::bail!("HEARTBEAT_INTERVAL_SECS must be a positive integer"),
            },
            None => defaults.heartbeat_interval,
        };

        let pool_limit = match lookup("WAITING_POOL_LIMIT") {
            Some(limit) => match limit.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => anyhow::bail!("WAITING_POOL_LIMIT must be a positive integer"),
            },
            None => defaults.pool_limit,
        };

        Ok(Self {
            server_host,
            server_port,
            environment,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            frontend_url: lookup("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            client_dir: lookup("CLIENT_DIR").map_or(defaults.client_dir, PathBuf::from),
            heartbeat_interval,
            pool_limit,
        })
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(port) = cli.port {
            self.server_port = port;
        }
        self
    }

    /// Build the socket address for the server to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_host, self.server_port)
    }
}
