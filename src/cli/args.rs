//! Command-line argument parsing

use crate::config::{
    DEFAULT_CATALOG_PAGE_SIZE, DEFAULT_DOCKER_BIN, DEFAULT_DOCKER_HOST, DEFAULT_REQUEST_TIMEOUT,
    RegistryEndpoint, RunMode, SyncConfig,
};
use crate::error::{Result, SyncError};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "registry-sync")]
#[command(about = "Mirror images between two Docker registries, or purge what the source no longer has")]
#[command(version, author)]
pub struct Args {
    /// Source registry
    #[arg(long = "from", help = "Source registry host, optionally with http:// or https://")]
    pub from: String,

    /// Destination registry
    #[arg(long = "to", help = "Destination registry host, optionally with http:// or https://")]
    pub to: String,

    /// Workers per stage
    #[arg(
        long = "threads-num",
        help = "Number of workers per stage [default: 1]"
    )]
    pub threads_num: Option<usize>,

    #[arg(
        long = "dry-run",
        help = "Enumerate and validate only, transfer or delete nothing"
    )]
    pub dry_run: bool,

    #[arg(long = "print-list", help = "Print the list of verified images")]
    pub print_list: bool,

    #[arg(
        long = "no-diff",
        help = "Treat every source image as a candidate, skipping destination enumeration"
    )]
    pub no_diff: bool,

    #[arg(
        long = "purge",
        conflicts_with = "no_diff",
        help = "Delete destination images that are absent from the source"
    )]
    pub purge: bool,

    #[arg(
        long = "poll-timeout",
        default_value = "5",
        help = "Seconds a worker waits on an empty queue before exiting"
    )]
    pub poll_timeout: u64,

    /// Timeout in seconds for registry requests and engine calls
    #[arg(
        long = "timeout",
        short = 't',
        help = "Timeout for network operations in seconds [default: 300]"
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "catalog-size",
        default_value_t = DEFAULT_CATALOG_PAGE_SIZE,
        help = "Catalog page size requested from each registry"
    )]
    pub catalog_size: usize,

    #[arg(
        long = "docker-host",
        help = "Local container engine endpoint [default: unix:///var/run/docker.sock]"
    )]
    pub docker_host: Option<String>,

    #[arg(
        long = "docker-bin",
        default_value = DEFAULT_DOCKER_BIN,
        help = "Path to the docker CLI"
    )]
    pub docker_bin: String,

    /// Skip TLS verification
    #[arg(
        long = "skip-tls",
        short = 'k',
        help = "Skip TLS certificate verification"
    )]
    pub skip_tls: bool,

    #[arg(
        long = "plain-http",
        help = "Use http:// for registries given without a scheme"
    )]
    pub plain_http: bool,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print errors and requested lists"
    )]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Fill options the command line left unset from the environment
    pub fn from_env(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.threads_num.is_none() {
            self.threads_num = lookup("REGISTRY_SYNC_THREADS").and_then(|v| v.parse().ok());
        }

        if self.timeout.is_none() {
            self.timeout = lookup("REGISTRY_SYNC_TIMEOUT").and_then(|v| v.parse().ok());
        }

        if self.docker_host.is_none() {
            self.docker_host = lookup("REGISTRY_SYNC_DOCKER_HOST");
        }

        if lookup("REGISTRY_SYNC_VERBOSE").is_some() && !self.quiet {
            self.verbose = true;
        }

        if lookup("REGISTRY_SYNC_SKIP_TLS").is_some() {
            self.skip_tls = true;
        }

        self
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<()> {
        if self.threads_num == Some(0) {
            return Err(SyncError::Config(
                "Thread count must be greater than 0".to_string(),
            ));
        }

        if self.timeout == Some(0) {
            return Err(SyncError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.poll_timeout == 0 {
            return Err(SyncError::Config(
                "Poll timeout must be greater than 0".to_string(),
            ));
        }

        if self.purge && self.no_diff {
            return Err(SyncError::Config(
                "--purge cannot be combined with --no-diff".to_string(),
            ));
        }

        Ok(())
    }

    pub fn into_config(self) -> Result<SyncConfig> {
        self.validate()?;

        let source = RegistryEndpoint::parse(&self.from, self.plain_http)?;
        let destination = RegistryEndpoint::parse(&self.to, self.plain_http)?;
        let mode = if self.purge {
            RunMode::Purge
        } else {
            RunMode::Sync {
                no_diff: self.no_diff,
            }
        };

        let mut config = SyncConfig::new(source, destination)
            .with_mode(mode)
            .with_concurrency(self.threads_num.unwrap_or(1))
            .with_dry_run(self.dry_run)
            .with_print_list(self.print_list)
            .with_poll_timeout(Duration::from_secs(self.poll_timeout));
        config.request_timeout = self
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        config.catalog_page_size = self.catalog_size;
        config.skip_tls = self.skip_tls;
        config.docker_host = self
            .docker_host
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string());
        config.docker_bin = self.docker_bin;

        config.validate()?;
        Ok(config)
    }
}
