// HTTP implementation of the registry capability, composed from the
// catalog, manifest and blob operation groups.

use crate::config::RegistryEndpoint;
use crate::error::{Result, SyncError};
use crate::image::Manifest;
use crate::logging::Logger;
use crate::registry::RegistryApi;
use crate::registry::operations::{BlobOperations, CatalogOperations, ManifestOperations};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct RegistryClientBuilder {
    endpoint: RegistryEndpoint,
    timeout: Duration,
    skip_tls: bool,
    output: Logger,
}

impl RegistryClientBuilder {
    pub fn new(endpoint: RegistryEndpoint) -> Self {
        Self {
            endpoint,
            timeout: crate::config::DEFAULT_REQUEST_TIMEOUT,
            skip_tls: false,
            output: Logger::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn with_output(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout.min(Duration::from_secs(30)));

        if self.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let address = self.endpoint.base_url.clone();
        Ok(RegistryClient {
            catalog: CatalogOperations::new(client.clone(), address.clone(), self.output.clone()),
            manifests: ManifestOperations::new(client.clone(), address.clone(), self.output.clone()),
            blobs: BlobOperations::new(client, address, self.output),
            endpoint: self.endpoint,
        })
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    endpoint: RegistryEndpoint,
    catalog: CatalogOperations,
    manifests: ManifestOperations,
    blobs: BlobOperations,
}

impl RegistryClient {
    pub fn builder(endpoint: RegistryEndpoint) -> RegistryClientBuilder {
        RegistryClientBuilder::new(endpoint)
    }

    pub fn endpoint(&self) -> &RegistryEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    fn host(&self) -> &str {
        &self.endpoint.host
    }

    async fn list_repositories(&self, page_size: usize) -> Result<Vec<String>> {
        self.catalog.list_repositories(page_size).await
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        self.catalog.list_tags(repository).await
    }

    async fn fetch_manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        self.manifests.fetch_manifest(repository, reference).await
    }

    async fn probe_blob(&self, repository: &str, digest: &str) -> Result<()> {
        self.blobs.probe_blob(repository, digest).await
    }

    async fn resolve_manifest_digest(&self, repository: &str, reference: &str) -> Result<String> {
        self.manifests.resolve_digest(repository, reference).await
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<u16> {
        self.manifests.delete_manifest(repository, digest).await
    }
}
