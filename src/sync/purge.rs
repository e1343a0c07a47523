//! Deletion of destination images that no longer exist on the source
//!
//! Registries delete manifests, not tags: removing a digest drops every tag
//! that points at it. A candidate whose digest is shared with a tag the run
//! keeps is therefore skipped.

use crate::concurrency::{WorkQueue, run_workers};
use crate::config::DEFAULT_POLL_TIMEOUT;
use crate::error::{ErrorKind, SyncError};
use crate::image::{ImageRef, ImageRefSet};
use crate::logging::Logger;
use crate::registry::RegistryApi;
use crate::sync::diff::diff;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeCandidate {
    pub image: ImageRef,
    /// Manifest digest on the destination, filled in just before deletion
    pub digest: Option<String>,
}

impl PurgeCandidate {
    pub fn new(image: ImageRef) -> Self {
        Self { image, digest: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub candidate: PurgeCandidate,
    pub status: Option<u16>,
    pub error: Option<SyncError>,
    /// Kept destination tag pointing at the same manifest
    pub shared_with: Option<ImageRef>,
}

impl PurgeOutcome {
    fn new(candidate: PurgeCandidate) -> Self {
        Self {
            candidate,
            status: None,
            error: None,
            shared_with: None,
        }
    }

    pub fn is_purged(&self) -> bool {
        self.status.is_some() && self.error.is_none()
    }

    /// Nothing was deleted because the digest was unknown or still in use
    pub fn is_skipped(&self) -> bool {
        self.candidate.digest.is_none() || self.shared_with.is_some()
    }
}

/// Kept destination tags grouped by repository
type KeptTags = HashMap<String, Vec<ImageRef>>;

pub struct PurgeEngine {
    destination: Arc<dyn RegistryApi>,
    concurrency: usize,
    poll_timeout: Duration,
    output: Logger,
}

impl PurgeEngine {
    pub fn new(destination: Arc<dyn RegistryApi>, output: Logger) -> Self {
        Self {
            destination,
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

    /// Destination images absent from the source, in sorted order
    pub fn candidates(source: &ImageRefSet, destination: &ImageRefSet) -> Vec<PurgeCandidate> {
        diff(destination, source)
            .sorted()
            .into_iter()
            .map(PurgeCandidate::new)
            .collect()
    }

    /// Destination images the source still has
    pub fn kept(source: &ImageRefSet, destination: &ImageRefSet) -> ImageRefSet {
        destination
            .iter()
            .filter(|image| source.contains(image))
            .cloned()
            .collect()
    }

    /// Resolve the digest of one candidate and delete its manifest.
    ///
    /// A digest that cannot be resolved skips the image; deletion is never
    /// attempted by tag. `kept` are the surviving tags of the candidate's
    /// repository; if one of them resolves to the same digest the delete is
    /// skipped, and if one cannot be checked it is refused.
    pub async fn purge_image(
        destination: &dyn RegistryApi,
        image: ImageRef,
        kept: &[ImageRef],
    ) -> PurgeOutcome {
        let mut outcome = PurgeOutcome::new(PurgeCandidate::new(image));
        let repository = outcome.candidate.image.repository().to_string();

        let digest = match destination
            .resolve_manifest_digest(&repository, outcome.candidate.image.tag())
            .await
        {
            Ok(digest) => digest,
            Err(e) => {
                outcome.error = Some(e.with_context("resolve digest"));
                return outcome;
            }
        };
        outcome.candidate.digest = Some(digest.clone());

        for other in kept {
            match destination.resolve_manifest_digest(&repository, other.tag()).await {
                Ok(other_digest) if other_digest == digest => {
                    outcome.shared_with = Some(other.clone());
                    return outcome;
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    outcome.error =
                        Some(e.with_context(&format!("check digest of kept tag {}", other)));
                    return outcome;
                }
            }
        }

        match destination.delete_manifest(&repository, &digest).await {
            Ok(status) => outcome.status = Some(status),
            Err(e) => outcome.error = Some(e.with_context(&format!("delete {}", digest))),
        }
        outcome
    }

    /// Delete every candidate with the worker pool. `kept` holds the
    /// destination images that survive the purge.
    pub async fn run(&self, candidates: Vec<PurgeCandidate>, kept: &ImageRefSet) -> Vec<PurgeOutcome> {
        let mut queue = WorkQueue::new();
        queue.extend(candidates.into_iter().map(|candidate| candidate.image));
        let queue = Arc::new(queue);
        self.output
            .info(&format!("{} images queued for deletion", queue.len()));

        let mut by_repository = KeptTags::new();
        for image in kept.sorted() {
            by_repository
                .entry(image.repository().to_string())
                .or_default()
                .push(image);
        }
        let kept = Arc::new(by_repository);

        let per_worker = run_workers("purge", self.concurrency, &self.output, |id| {
            let destination = Arc::clone(&self.destination);
            let queue = Arc::clone(&queue);
            let kept = Arc::clone(&kept);
            let output = self.output.clone();
            let poll_timeout = self.poll_timeout;

            async move {
                let mut outcomes = Vec::new();
                while let Some(image) = queue.recv_timeout(poll_timeout).await {
                    let siblings = kept
                        .get(image.repository())
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    let outcome = Self::purge_image(destination.as_ref(), image, siblings).await;
                    log_outcome(&output, id, &outcome);
                    outcomes.push(outcome);
                }
                outcomes
            }
        })
        .await;

        per_worker.into_iter().flatten().collect()
    }
}

fn log_outcome(output: &Logger, worker: usize, outcome: &PurgeOutcome) {
    let image = &outcome.candidate.image;
    if let Some(other) = &outcome.shared_with {
        output.warning(&format!(
            "Skipping {}, its manifest is also tagged as {}",
            image, other
        ));
        return;
    }
    match (&outcome.error, outcome.status) {
        (None, Some(status)) => output.success(&format!(
            "Worker {} deleted {} (status {})",
            worker, image, status
        )),
        (Some(e), _) if outcome.is_skipped() => output.warning(&format!(
            "Skipping {}, digest not resolved ({}): {}",
            image,
            e.kind(),
            e
        )),
        (Some(e), _) => output.error(&format!(
            "Failed to delete {} ({}): {}",
            image,
            e.kind(),
            e
        )),
        (None, None) => {}
    }
}
