//! Registry Sync Library
//!
//! Library root for the registry-sync crate: catalog enumeration, diffing,
//! manifest validation, image transfer and purge between two Docker
//! registries.

pub mod cli;
pub mod concurrency;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod logging;
pub mod registry;
pub mod sync;

pub use config::{RegistryEndpoint, RunMode, SyncConfig};
pub use error::{ErrorKind, Result, SyncError};
pub use image::{ImageRef, ImageRefSet};
pub use logging::Logger;
