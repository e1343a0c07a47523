//! Container engine capability
//!
//! The sync stage moves images through a local container engine. Each sync
//! worker obtains its own [`ContainerEngine`] handle from an
//! [`EngineFactory`]; handles are never shared between workers.

pub mod docker;

pub use docker::{DockerCli, DockerCliFactory};

use crate::error::Result;
use async_trait::async_trait;

/// Operations the sync stage needs from a container engine.
///
/// Failures are `NotFound` when the image does not exist, `Transient` when
/// the call timed out and `Api` otherwise.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn pull(&self, image: &str) -> Result<()>;

    async fn tag(&self, source: &str, target: &str) -> Result<()>;

    async fn push(&self, image: &str) -> Result<()>;

    async fn remove_image(&self, image: &str) -> Result<()>;
}

pub trait EngineFactory: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ContainerEngine>>;
}
