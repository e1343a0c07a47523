//! Image transfer through a local container engine
//!
//! Each verified image is pulled from the source, retagged for the
//! destination, pushed, and finally removed from the engine again.

use crate::concurrency::{WorkQueue, run_workers};
use crate::config::DEFAULT_POLL_TIMEOUT;
use crate::engine::{ContainerEngine, EngineFactory};
use crate::error::{ErrorKind, SyncError};
use crate::image::ImageRef;
use crate::logging::Logger;
use std::sync::Arc;
use std::time::Duration;

/// Furthest stage an image reached; stages only ever advance in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncStage {
    Queued,
    Pulled,
    Tagged,
    Pushed,
    Cleaned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub image: ImageRef,
    pub stage_reached: SyncStage,
    pub error: Option<SyncError>,
    pub cleanup_error: Option<SyncError>,
    /// Local image a failed run left on the engine
    pub left_on_engine: Option<String>,
}

impl SyncOutcome {
    fn new(image: ImageRef) -> Self {
        Self {
            image,
            stage_reached: SyncStage::Queued,
            error: None,
            cleanup_error: None,
            left_on_engine: None,
        }
    }

    /// The destination has the image, whether or not cleanup succeeded
    pub fn is_synced(&self) -> bool {
        self.stage_reached >= SyncStage::Pushed
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    source_host: String,
    destination_host: String,
    engines: Arc<dyn EngineFactory>,
    concurrency: usize,
    poll_timeout: Duration,
    output: Logger,
}

impl SyncEngine {
    pub fn new(
        source_host: impl Into<String>,
        destination_host: impl Into<String>,
        engines: Arc<dyn EngineFactory>,
        output: Logger,
    ) -> Self {
        Self {
            source_host: source_host.into(),
            destination_host: destination_host.into(),
            engines,
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

    /// Mirror a single image with the given engine handle.
    ///
    /// Pull or tag failure ends the image without cleanup. Once a push has
    /// been attempted both local tags are removed, and a failed removal is
    /// recorded separately from the transfer error.
    pub async fn sync_image(&self, engine: &dyn ContainerEngine, image: &ImageRef) -> SyncOutcome {
        let mut outcome = SyncOutcome::new(image.clone());
        let old = image.qualified(&self.source_host);
        let new = image.qualified(&self.destination_host);

        if let Err(e) = engine.pull(&old).await {
            outcome.error = Some(e.with_context(&format!("pull {}", old)));
            return outcome;
        }
        outcome.stage_reached = SyncStage::Pulled;

        if let Err(e) = engine.tag(&old, &new).await {
            outcome.error = Some(e.with_context(&format!("tag {} as {}", old, new)));
            outcome.left_on_engine = Some(old);
            return outcome;
        }
        outcome.stage_reached = SyncStage::Tagged;

        match engine.push(&new).await {
            Ok(()) => outcome.stage_reached = SyncStage::Pushed,
            Err(e) => outcome.error = Some(e.with_context(&format!("push {}", new))),
        }

        let mut cleanup_error = None;
        for local in [&new, &old] {
            if let Err(e) = engine.remove_image(local).await {
                self.output
                    .warning(&format!("Failed to remove local image {}: {}", local, e));
                if cleanup_error.is_none() {
                    cleanup_error = Some(e.with_context(&format!("remove {}", local)));
                }
            }
        }
        outcome.cleanup_error = cleanup_error;

        if outcome.stage_reached == SyncStage::Pushed && outcome.cleanup_error.is_none() {
            outcome.stage_reached = SyncStage::Cleaned;
        }
        outcome
    }

    /// Drain `queue` with the worker pool; every worker connects its own
    /// engine handle. Returns once all workers have exited.
    pub async fn run(&self, queue: Arc<WorkQueue<ImageRef>>) -> Vec<SyncOutcome> {
        let per_worker = run_workers("sync", self.concurrency, &self.output, |id| {
            let engine = self.clone();
            let queue = Arc::clone(&queue);

            async move {
                let handle = match engine.engines.connect() {
                    Ok(handle) => handle,
                    Err(e) => {
                        engine
                            .output
                            .error(&format!("Sync worker {} could not connect to engine: {}", id, e));
                        return Vec::new();
                    }
                };

                let mut outcomes = Vec::new();
                while let Some(image) = queue.recv_timeout(engine.poll_timeout).await {
                    engine.output.step(&format!(
                        "Worker {} syncing {} ({} left in queue)",
                        id,
                        image,
                        queue.len()
                    ));
                    let outcome = engine.sync_image(handle.as_ref(), &image).await;
                    engine.log_outcome(&outcome);
                    outcomes.push(outcome);
                }
                engine
                    .output
                    .verbose(&format!("Sync worker {} found the queue empty", id));
                outcomes
            }
        })
        .await;

        per_worker.into_iter().flatten().collect()
    }

    fn log_outcome(&self, outcome: &SyncOutcome) {
        if let Some(local) = &outcome.left_on_engine {
            self.output.warning(&format!(
                "{} was pulled but not cleaned up; remove it from the engine manually",
                local
            ));
        }
        match &outcome.error {
            None => self.output.success(&format!(
                "Synced {} to {}",
                outcome.image, self.destination_host
            )),
            Some(e) if outcome.stage_reached < SyncStage::Tagged && e.kind() == ErrorKind::NotFound => {
                self.output.warning(&format!(
                    "{} vanished since validation ({}): {}",
                    outcome.image,
                    e.kind(),
                    e
                ))
            }
            Some(e) => self.output.error(&format!(
                "Failed to sync {} ({}): {}",
                outcome.image,
                e.kind(),
                e
            )),
        }
    }
}
