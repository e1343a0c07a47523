//! Registry module for Docker registry interactions
//!
//! [`RegistryApi`] is the capability every pipeline stage talks to; the
//! [`RegistryClient`] implements it over the Docker Registry HTTP API v2.
//! All operations return a [`crate::error::Result`] whose error kind tells
//! the caller whether to skip the item or abort.

pub mod client;
pub mod operations;

pub use client::{RegistryClient, RegistryClientBuilder};

use crate::error::Result;
use crate::image::Manifest;
use async_trait::async_trait;

#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// `host[:port]` used when naming images for the container engine
    fn host(&self) -> &str;

    async fn list_repositories(&self, page_size: usize) -> Result<Vec<String>>;

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>>;

    async fn fetch_manifest(&self, repository: &str, reference: &str) -> Result<Manifest>;

    /// Ok iff the blob exists
    async fn probe_blob(&self, repository: &str, digest: &str) -> Result<()>;

    /// Content digest of a manifest, from the `Docker-Content-Digest` header
    async fn resolve_manifest_digest(&self, repository: &str, reference: &str) -> Result<String>;

    /// Returns the status code the registry answered with
    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<u16>;
}
