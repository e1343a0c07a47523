//! Sync pipeline stages

pub mod catalog;
pub mod diff;
pub mod pipeline;
pub mod purge;
pub mod report;
pub mod transfer;
pub mod validator;

pub use catalog::CatalogEnumerator;
pub use diff::diff;
pub use pipeline::SyncPipeline;
pub use purge::{PurgeCandidate, PurgeEngine, PurgeOutcome};
pub use report::RunSummary;
pub use transfer::{SyncEngine, SyncOutcome, SyncStage};
pub use validator::{ManifestValidator, ValidationResult, Verdict, validate_image};
