use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::auth::{Credentials, DEFAULT_TOKEN_PATH};

pub const DEFAULT_BASE_URL: &str = "https://api.cloud.example.com";
pub const DEFAULT_API_VERSION: &str = "v1";

/// Cloud API client - command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// API base URL
    #[arg(short = 'u', long, env = "CLOUDAPI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// API version prefix
    #[arg(long, env = "CLOUDAPI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Token endpoint path (relative to the base URL) or absolute URL
    #[arg(long, env = "CLOUDAPI_TOKEN_PATH", default_value = DEFAULT_TOKEN_PATH)]
    pub token_path: String,

    /// OAuth client id
    #[arg(short = 'i', long, env = "CLOUDAPI_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(short = 's', long, env = "CLOUDAPI_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Default per-service timeout in seconds
    #[arg(short = 't', long, env = "CLOUDAPI_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP max retries
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "3")]
    pub http_retries: u32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch an access token and print its type and expiry
    Token,
    /// List tenants as JSON
    Tenants,
    /// Authenticated GET against an API path, printed as JSON
    Get {
        /// Path relative to the base URL, e.g. /v1/tenants
        path: String,
    },
}

/// Resource services with independently configurable timeouts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    Tenants,
    Instances,
    Snapshots,
    Keys,
}

impl ServiceKind {
    fn env_var(self) -> &'static str {
        match self {
            ServiceKind::Tenants => "CLOUDAPI_TENANTS_TIMEOUT",
            ServiceKind::Instances => "CLOUDAPI_INSTANCES_TIMEOUT",
            ServiceKind::Snapshots => "CLOUDAPI_SNAPSHOTS_TIMEOUT",
            ServiceKind::Keys => "CLOUDAPI_KEYS_TIMEOUT",
        }
    }
}

/// Per-service timeout overrides; `None` falls back to the default timeout
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceTimeouts {
    pub tenants: Option<Duration>,
    pub instances: Option<Duration>,
    pub snapshots: Option<Duration>,
    pub keys: Option<Duration>,
}

impl ServiceTimeouts {
    fn get(&self, kind: ServiceKind) -> Option<Duration> {
        match kind {
            ServiceKind::Tenants => self.tenants,
            ServiceKind::Instances => self.instances,
            ServiceKind::Snapshots => self.snapshots,
            ServiceKind::Keys => self.keys,
        }
    }

    fn set(&mut self, kind: ServiceKind, timeout: Duration) {
        let slot = match kind {
            ServiceKind::Tenants => &mut self.tenants,
            ServiceKind::Instances => &mut self.instances,
            ServiceKind::Snapshots => &mut self.snapshots,
            ServiceKind::Keys => &mut self.keys,
        };
        *slot = Some(timeout);
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Endpoint
    pub base_url: String,
    pub api_version: String,
    pub token_path: String,

    // Authentication
    pub credentials: Credentials,

    // Timeouts
    pub default_timeout: Duration,
    pub service_timeouts: ServiceTimeouts,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: Duration,
    pub http_max_retries: u32,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Configuration with defaults for everything but the endpoint and credentials
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            credentials,
            default_timeout: Duration::from_secs(30),
            service_timeouts: ServiceTimeouts::default(),
            http_max_connections: 20,
            http_connect_timeout: Duration::from_secs(10),
            http_max_retries: 3,
            log_level: "info".to_string(),
        }
    }

    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let command = args.command.clone().unwrap_or(Command::Token);

        Ok((Self::from_args(args)?, command))
    }

    /// Build configuration from parsed arguments plus env-only settings
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let client_id = args
            .client_id
            .context("CLOUDAPI_CLIENT_ID is required (use -i or set CLOUDAPI_CLIENT_ID env var)")?;
        let client_secret = args.client_secret.context(
            "CLOUDAPI_CLIENT_SECRET is required (use -s or set CLOUDAPI_CLIENT_SECRET env var)",
        )?;

        let mut service_timeouts = ServiceTimeouts::default();
        for kind in [
            ServiceKind::Tenants,
            ServiceKind::Instances,
            ServiceKind::Snapshots,
            ServiceKind::Keys,
        ] {
            if let Some(secs) = env_u64(kind.env_var()) {
                service_timeouts.set(kind, Duration::from_secs(secs));
            }
        }

        Ok(Config {
            base_url: args.base_url,
            api_version: args.api_version,
            token_path: args.token_path,

            credentials: Credentials::new(client_id, client_secret),

            default_timeout: Duration::from_secs(args.timeout),
            service_timeouts,

            http_max_connections: env_u64("HTTP_MAX_CONNECTIONS").unwrap_or(20) as usize,
            http_connect_timeout: Duration::from_secs(
                env_u64("HTTP_CONNECT_TIMEOUT").unwrap_or(10),
            ),
            http_max_retries: args.http_retries,

            log_level: args.log_level,
        })
    }

    /// Override the timeout of a single service
    pub fn with_service_timeout(mut self, kind: ServiceKind, timeout: Duration) -> Self {
        self.service_timeouts.set(kind, timeout);
        self
    }

    /// Effective timeout of a service
    pub fn timeout_for(&self, kind: ServiceKind) -> Duration {
        self.service_timeouts
            .get(kind)
            .unwrap_or(self.default_timeout)
    }

    /// Path prefix for resource endpoints, e.g. `/v1`
    pub fn api_prefix(&self) -> String {
        format!("/{}", self.api_version.trim_matches('/'))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.credentials.is_complete() {
            anyhow::bail!("Client id and client secret must both be non-empty");
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!(
                "Base URL must start with http:// or https://: {}",
                self.base_url
            );
        }

        if self.default_timeout.is_zero() {
            anyhow::bail!("Default timeout must be greater than zero");
        }

        for kind in [
            ServiceKind::Tenants,
            ServiceKind::Instances,
            ServiceKind::Snapshots,
            ServiceKind::Keys,
        ] {
            if self.timeout_for(kind).is_zero() {
                anyhow::bail!("{} must be greater than zero", kind.env_var());
            }
        }

        Ok(())
    }
}

/// Parse a numeric environment variable, ignoring unset or malformed values
fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
