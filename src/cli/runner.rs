//! Wires parsed arguments to registry clients, the engine and the pipeline

use crate::cli::args::Args;
use crate::config::{RegistryEndpoint, SyncConfig};
use crate::engine::DockerCliFactory;
use crate::error::Result;
use crate::logging::Logger;
use crate::registry::RegistryClient;
use crate::sync::{RunSummary, SyncPipeline};
use std::sync::Arc;

pub struct Runner {
    config: SyncConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };
        let config = args.into_config()?;

        Ok(Self { config, output })
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let source = self.create_registry_client(&self.config.source)?;
        let destination = self.create_registry_client(&self.config.destination)?;

        let engines = DockerCliFactory::new(
            self.config.docker_bin.clone(),
            self.config.docker_host.clone(),
            self.config.request_timeout,
        )?;
        self.output.verbose(&format!(
            "Container engine: {} at {}",
            self.config.docker_bin, self.config.docker_host
        ));

        let pipeline = SyncPipeline::new(
            self.config.clone(),
            Arc::new(source),
            Arc::new(destination),
            Arc::new(engines),
            self.output.clone(),
        );
        pipeline.run().await
    }

    fn create_registry_client(&self, endpoint: &RegistryEndpoint) -> Result<RegistryClient> {
        self.output
            .verbose(&format!("Registry client for {}", endpoint.base_url));
        if self.config.skip_tls {
            self.output.warning(&format!(
                "TLS certificate verification disabled for {}",
                endpoint
            ));
        }

        RegistryClient::builder(endpoint.clone())
            .with_timeout(self.config.request_timeout)
            .with_skip_tls(self.config.skip_tls)
            .with_output(self.output.clone())
            .build()
    }
}
