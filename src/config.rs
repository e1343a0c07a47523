//! Run configuration and registry endpoint parsing

use crate::error::{Result, SyncError};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CATALOG_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// A registry as addressed by both HTTP requests and engine image names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    /// `host[:port]`, used to build engine references
    pub host: String,
    /// `scheme://host[:port]`, used for API requests
    pub base_url: String,
}

impl RegistryEndpoint {
    /// Parse `host`, `host:port` or `http(s)://host[:port]`.
    ///
    /// Without an explicit scheme `https` is used unless `plain_http` is set.
    pub fn parse(input: &str, plain_http: bool) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(SyncError::Config("Registry host cannot be empty".to_string()));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else if plain_http {
            format!("http://{}", trimmed)
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| SyncError::Config(format!("Invalid registry '{}': {}", input, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::Config(format!(
                "Registry '{}' must use http or https",
                input
            )));
        }
        if url.path() != "/" && !url.path().is_empty() {
            return Err(SyncError::Config(format!(
                "Registry '{}' must be a host without a path",
                input
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| SyncError::Config(format!("Registry '{}' has no host", input)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            base_url: format!("{}://{}", url.scheme(), host),
            host,
        })
    }
}

impl fmt::Display for RegistryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// What a run does. Purge replaces the sync path entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Mirror missing images; with `no_diff` every source image is a candidate
    Sync { no_diff: bool },
    /// Delete destination images that are absent from the source
    Purge,
}

impl RunMode {
    pub fn description(&self) -> &'static str {
        match self {
            RunMode::Sync { no_diff: false } => "Sync images missing from destination",
            RunMode::Sync { no_diff: true } => "Sync every source image (no diff)",
            RunMode::Purge => "Purge destination images absent from source",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub source: RegistryEndpoint,
    pub destination: RegistryEndpoint,
    pub mode: RunMode,
    pub concurrency: usize,
    pub dry_run: bool,
    pub print_list: bool,
    /// Idle time after which a worker assumes its queue is exhausted
    pub poll_timeout: Duration,
    /// Per-request and per-engine-call timeout
    pub request_timeout: Duration,
    pub catalog_page_size: usize,
    pub skip_tls: bool,
    pub docker_host: String,
    pub docker_bin: String,
}

impl SyncConfig {
    pub fn new(source: RegistryEndpoint, destination: RegistryEndpoint) -> Self {
        Self {
            source,
            destination,
            mode: RunMode::Sync { no_diff: false },
            concurrency: 1,
            dry_run: false,
            print_list: false,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            catalog_page_size: DEFAULT_CATALOG_PAGE_SIZE,
            skip_tls: false,
            docker_host: DEFAULT_DOCKER_HOST.to_string(),
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_print_list(mut self, print_list: bool) -> Self {
        self.print_list = print_list;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SyncError::Config(
                "Thread count must be greater than 0".to_string(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(SyncError::Config(
                "Poll timeout must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(SyncError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        if self.catalog_page_size == 0 {
            return Err(SyncError::Config(
                "Catalog page size must be greater than 0".to_string(),
            ));
        }
        if self.source == self.destination {
            return Err(SyncError::Config(format!(
                "Source and destination are the same registry: {}",
                self.source
            )));
        }
        Ok(())
    }
}
