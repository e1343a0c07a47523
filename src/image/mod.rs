//! Image references and manifests
//!
//! [`ImageRef`] and [`ImageRefSet`] are the values passed between every
//! stage of the sync pipeline. [`Manifest`] extracts the blob and child
//! manifest digests that validation must probe.

pub mod manifest;
pub mod reference;

pub use manifest::{Descriptor, FsLayer, Manifest};
pub use reference::{ImageRef, ImageRefSet};
