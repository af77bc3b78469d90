//! Command line options.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use padrone_client::ClientConfig;
use padrone_core::wire::decode_endpoint;
use padrone_core::AuthToken;
use std::net::SocketAddr;
use std::time::Duration;

/// Padrone - Talk to a game master server from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "padrone")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Master server base URL
    #[arg(short, long, env = "PADRONE_URL", default_value = "http://localhost:15492")]
    pub url: String,

    /// Game version used for host listings and registration
    #[arg(long, env = "PADRONE_APP_VERSION", default_value = "0.0.0")]
    pub app_version: String,

    /// Authentication method
    #[arg(long, env = "PADRONE_AUTH_METHOD", value_enum, default_value = "admin")]
    pub auth_method: AuthMethod,

    /// Credentials for the auth method.
    /// Format: USER,PASSWORD (admin), USER_ID,NONCE (oculus), hex ticket (steam), key (itch)
    #[arg(long, env = "PADRONE_AUTH_CREDENTIALS", default_value = "")]
    pub auth_credentials: String,

    /// Request timeout in seconds
    #[arg(long, env = "PADRONE_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Transports per HTTP method
    #[arg(long, env = "PADRONE_POOL_SIZE", default_value = "16")]
    pub pool_size: usize,

    /// Enable debug logging
    #[arg(long, env = "PADRONE_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Admin,
    Steam,
    ItchDownloadKey,
    ItchApiKey,
    Oculus,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register a host
    RegisterHost {
        /// Host name shown in listings
        #[arg(long)]
        name: String,
        /// Public endpoint (ADDRESS:PORT)
        #[arg(long, value_parser = parse_endpoint)]
        external: SocketAddr,
        /// LAN endpoint (ADDRESS:PORT)
        #[arg(long, value_parser = parse_endpoint)]
        internal: SocketAddr,
        #[arg(long)]
        password: Option<String>,
        /// Hide the host from listings
        #[arg(long)]
        private: bool,
        #[arg(long, default_value = "8")]
        max_players: u32,
    },
    /// Remove a host from the registry
    UnregisterHost {
        #[arg(value_parser = parse_endpoint)]
        external: SocketAddr,
    },
    /// List hosts running this game version
    ListHosts {
        /// Skip hosts with no free slots
        #[arg(long)]
        hide_full: bool,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Look up the player behind a session
    PlayerInfo {
        #[arg(value_parser = parse_endpoint)]
        host: SocketAddr,
        session_id: String,
    },
    /// Send a host heartbeat
    Ping {
        #[arg(value_parser = parse_endpoint)]
        host: SocketAddr,
        /// Connected session ids
        sessions: Vec<String>,
    },
    /// Check that the master server is up
    HealthCheck,
    /// Show the authenticated player
    Me,
    /// Join a host
    Join {
        #[arg(value_parser = parse_endpoint)]
        host: SocketAddr,
        #[arg(long)]
        password: Option<String>,
    },
    /// Leave the current host
    Leave,
    /// Report, as a host, that a session left
    ReportLeave {
        #[arg(value_parser = parse_endpoint)]
        host: SocketAddr,
        session_id: String,
    },
    /// Check master server health periodically
    Monitor {
        /// Interval between checks in seconds
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
        /// Consecutive failures before reporting unhealthy
        #[arg(long, default_value = "3")]
        failure_threshold: u32,
    },
}

fn parse_endpoint(s: &str) -> Result<SocketAddr, String> {
    decode_endpoint(s).map_err(|e| e.to_string())
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.url, &self.app_version)
            .with_pool_capacity(self.pool_size)
            .with_request_timeout(Duration::from_secs(self.timeout))
    }

    /// Build the auth token from `--auth-method` and `--auth-credentials`.
    pub fn auth_token(&self) -> Result<AuthToken> {
        let credentials = self.auth_credentials.as_str();
        let token = match self.auth_method {
            AuthMethod::Admin => {
                let (username, password) = split_pair(credentials, "USER,PASSWORD")?;
                AuthToken::admin(username, password)
            }
            AuthMethod::Oculus => {
                let (user_id, nonce) = split_pair(credentials, "USER_ID,NONCE")?;
                AuthToken::oculus(user_id, nonce)
            }
            AuthMethod::Steam => {
                let ticket = hex::decode(credentials).context("steam ticket must be hex")?;
                AuthToken::steam(&ticket, ticket.len())
            }
            AuthMethod::ItchDownloadKey => AuthToken::itch_download_key(credentials),
            AuthMethod::ItchApiKey => AuthToken::itch_api_key(credentials),
        };
        Ok(token)
    }
}

fn split_pair<'a>(credentials: &'a str, format: &str) -> Result<(&'a str, &'a str)> {
    credentials
        .split_once(',')
        .ok_or_else(|| anyhow!("auth credentials must be {}", format))
}
