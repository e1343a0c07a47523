//! Manifest and blob validation of sync candidates
//!
//! A candidate is only worth syncing if the source can actually serve it:
//! the manifest must be fetchable and every blob it references must exist.

use crate::concurrency::{WorkQueue, run_workers};
use crate::config::DEFAULT_POLL_TIMEOUT;
use crate::error::{ErrorKind, SyncError};
use crate::image::ImageRef;
use crate::logging::Logger;
use crate::registry::RegistryApi;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub image: ImageRef,
    pub verdict: Verdict,
    pub reason: Option<SyncError>,
}

impl ValidationResult {
    pub fn good(image: ImageRef) -> Self {
        Self {
            image,
            verdict: Verdict::Good,
            reason: None,
        }
    }

    pub fn bad(image: ImageRef, reason: SyncError) -> Self {
        Self {
            image,
            verdict: Verdict::Bad,
            reason: Some(reason),
        }
    }

    pub fn is_good(&self) -> bool {
        self.verdict == Verdict::Good
    }
}

/// Check one image against the source registry.
///
/// Stops at the first failed probe; a failed manifest fetch means no blob
/// is probed at all.
pub async fn validate_image(source: &dyn RegistryApi, image: &ImageRef) -> ValidationResult {
    let repository = image.repository();

    let manifest = match source.fetch_manifest(repository, image.tag()).await {
        Ok(manifest) => manifest,
        Err(e) => return ValidationResult::bad(image.clone(), e.with_context("manifest")),
    };

    for digest in manifest.blob_digests() {
        if let Err(e) = source.probe_blob(repository, &digest).await {
            return ValidationResult::bad(image.clone(), e.with_context(&format!("blob {}", digest)));
        }
    }

    for digest in manifest.child_manifests() {
        if let Err(e) = source.resolve_manifest_digest(repository, &digest).await {
            return ValidationResult::bad(
                image.clone(),
                e.with_context(&format!("child manifest {}", digest)),
            );
        }
    }

    ValidationResult::good(image.clone())
}

pub struct ManifestValidator {
    source: Arc<dyn RegistryApi>,
    concurrency: usize,
    poll_timeout: Duration,
    output: Logger,
}

impl ManifestValidator {
    pub fn new(source: Arc<dyn RegistryApi>, output: Logger) -> Self {
        Self {
            source,
            concurrency: 1,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            output,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Drain `candidates` with the worker pool, pushing every image that
    /// validates onto `good`. Returns once every worker has exited.
    pub async fn run(
        &self,
        candidates: Arc<WorkQueue<ImageRef>>,
        good: Arc<WorkQueue<ImageRef>>,
    ) -> Vec<ValidationResult> {
        let per_worker = run_workers("validation", self.concurrency, &self.output, |id| {
            let source = Arc::clone(&self.source);
            let candidates = Arc::clone(&candidates);
            let good = Arc::clone(&good);
            let output = self.output.clone();
            let poll_timeout = self.poll_timeout;

            async move {
                let mut results = Vec::new();
                while let Some(image) = candidates.recv_timeout(poll_timeout).await {
                    let result = validate_image(source.as_ref(), &image).await;
                    match &result.reason {
                        None => {
                            output.detail(&format!("Validated {}", image));
                            good.push(image);
                        }
                        Some(reason) => log_rejection(&output, &result.image, reason),
                    }
                    results.push(result);
                }
                output.verbose(&format!(
                    "Validation worker {} found the queue empty, {} left",
                    id,
                    candidates.len()
                ));
                results
            }
        })
        .await;

        per_worker.into_iter().flatten().collect()
    }
}

fn log_rejection(output: &Logger, image: &ImageRef, reason: &SyncError) {
    let message = format!("Skipping {} ({}): {}", image, reason.kind(), reason);
    match reason.kind() {
        ErrorKind::NotFound | ErrorKind::Transient => output.warning(&message),
        _ => output.error(&message),
    }
}
