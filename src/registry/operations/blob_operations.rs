//! Blob operations for registry client
//!
//! Implements the Docker Registry v2 blob existence check
//! (HEAD /v2/{name}/blobs/{digest}).

use super::{ensure_success, send};
use crate::error::Result;
use crate::logging::Logger;
use reqwest::Client;

#[derive(Clone)]
pub struct BlobOperations {
    client: Client,
    address: String,
    output: Logger,
}

impl BlobOperations {
    pub fn new(client: Client, address: String, output: Logger) -> Self {
        Self {
            client,
            address,
            output,
        }
    }

    /// Succeeds iff the registry answers the HEAD with a success status
    pub async fn probe_blob(&self, repository: &str, digest: &str) -> Result<()> {
        let url = format!("{}/v2/{}/blobs/{}", self.address, repository, digest);

        let response = send(self.client.head(&url), "blob probe").await?;
        ensure_success(response, "blob probe").await?;

        self.output.detail(&format!("Blob {} present in {}", digest, repository));
        Ok(())
    }
}
