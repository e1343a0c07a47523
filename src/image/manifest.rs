//! Manifest parsing
//!
//! Only the references a manifest makes are of interest here: the blobs
//! that must exist for the image to be pullable, and for manifest lists the
//! per-platform manifests.

use crate::error::handlers::HttpErrorHandler;
use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::collections::HashSet;

pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const DOCKER_MANIFEST_LIST_V2: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const DOCKER_MANIFEST_V1_SIGNED: &str = "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const OCI_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_INDEX_V1: &str = "application/vnd.oci.image.index.v1+json";

/// Accept header sent on manifest fetches
pub fn manifest_accept_header() -> String {
    [
        DOCKER_MANIFEST_V2,
        DOCKER_MANIFEST_LIST_V2,
        OCI_MANIFEST_V1,
        OCI_INDEX_V1,
        DOCKER_MANIFEST_V1_SIGNED,
    ]
    .join(", ")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub media_type: Option<String>,
    /// Schema 1 layer list
    #[serde(default)]
    pub fs_layers: Vec<FsLayer>,
    #[serde(default)]
    pub config: Option<Descriptor>,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    /// Manifest list / OCI index entries
    #[serde(default)]
    pub manifests: Vec<Descriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsLayer {
    pub blob_sum: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl Manifest {
    /// Parse a manifest body, rejecting error payloads and manifests that
    /// reference nothing.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if let Some(err) = HttpErrorHandler::handle_error_payload(&value, "manifest fetch") {
            return Err(err);
        }

        let manifest: Manifest = serde_json::from_value(value)?;
        if manifest.blob_digests().is_empty() && manifest.child_manifests().is_empty() {
            return Err(SyncError::Api(
                "Manifest references no layers, config or child manifests".to_string(),
            ));
        }
        Ok(manifest)
    }

    pub fn is_index(&self) -> bool {
        !self.manifests.is_empty()
    }

    /// Blob digests in declaration order, each listed once
    pub fn blob_digests(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.fs_layers
            .iter()
            .map(|layer| layer.blob_sum.as_str())
            .chain(self.config.iter().map(|config| config.digest.as_str()))
            .chain(self.layers.iter().map(|layer| layer.digest.as_str()))
            .filter(|digest| seen.insert(*digest))
            .map(str::to_string)
            .collect()
    }

    /// Digests of per-platform manifests referenced by a list or index
    pub fn child_manifests(&self) -> Vec<String> {
        self.manifests.iter().map(|m| m.digest.clone()).collect()
    }
}
