//! Manifest operations for registry client
//!
//! Implements Docker Registry v2 manifest operations:
//! - Manifest download (GET /v2/{name}/manifests/{reference})
//! - Digest resolution (HEAD /v2/{name}/manifests/{reference})
//! - Manifest deletion (DELETE /v2/{name}/manifests/{digest})

use super::{ensure_success, send};
use crate::error::handlers::NetworkErrorHandler;
use crate::error::{Result, SyncError};
use crate::image::manifest::{Manifest, manifest_accept_header};
use crate::logging::Logger;
use reqwest::Client;
use reqwest::header::ACCEPT;

pub const CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";

#[derive(Clone)]
pub struct ManifestOperations {
    client: Client,
    address: String,
    output: Logger,
}

impl ManifestOperations {
    pub fn new(client: Client, address: String, output: Logger) -> Self {
        Self {
            client,
            address,
            output,
        }
    }

    pub async fn fetch_manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        let url = format!("{}/v2/{}/manifests/{}", self.address, repository, reference);
        self.output.detail(&format!("Fetching manifest {}:{}", repository, reference));

        let request = self.client.get(&url).header(ACCEPT, manifest_accept_header());
        let response = ensure_success(send(request, "manifest fetch").await?, "manifest fetch").await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "manifest fetch"))?;

        Manifest::parse(&body)
    }

    /// Resolve the content digest of a manifest without downloading it
    pub async fn resolve_digest(&self, repository: &str, reference: &str) -> Result<String> {
        let url = format!("{}/v2/{}/manifests/{}", self.address, repository, reference);

        let request = self.client.head(&url).header(ACCEPT, manifest_accept_header());
        let response = ensure_success(send(request, "manifest probe").await?, "manifest probe").await?;

        let digest = response
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                SyncError::Api(format!(
                    "No {} header for {}:{}",
                    CONTENT_DIGEST_HEADER, repository, reference
                ))
            })?;

        self.output.detail(&format!("Resolved {}:{} to {}", repository, reference, digest));
        Ok(digest.to_string())
    }

    /// Delete a manifest by digest, returning the registry's status code
    pub async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<u16> {
        let url = format!("{}/v2/{}/manifests/{}", self.address, repository, digest);

        let response = send(self.client.delete(&url), "manifest delete").await?;
        let status = response.status().as_u16();
        ensure_success(response, "manifest delete").await?;

        self.output.verbose(&format!("Deleted {}@{} (status {})", repository, digest, status));
        Ok(status)
    }
}
