//! Run orchestration
//!
//! [`SyncPipeline`] owns the two work queues and wires the stages together:
//! enumerate both registries, diff, validate, then either transfer the
//! verified images or, in purge mode, delete what the source no longer has.

use crate::concurrency::WorkQueue;
use crate::config::{RunMode, SyncConfig};
use crate::engine::EngineFactory;
use crate::error::Result;
use crate::image::{ImageRef, ImageRefSet};
use crate::logging::Logger;
use crate::registry::RegistryApi;
use crate::sync::catalog::CatalogEnumerator;
use crate::sync::diff::diff;
use crate::sync::purge::PurgeEngine;
use crate::sync::report::RunSummary;
use crate::sync::transfer::SyncEngine;
use crate::sync::validator::ManifestValidator;
use std::sync::Arc;
use std::time::Instant;

pub struct SyncPipeline {
    config: SyncConfig,
    source: Arc<dyn RegistryApi>,
    destination: Arc<dyn RegistryApi>,
    engines: Arc<dyn EngineFactory>,
    output: Logger,
    validate_queue: Arc<WorkQueue<ImageRef>>,
    good_queue: Arc<WorkQueue<ImageRef>>,
}

impl SyncPipeline {
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn RegistryApi>,
        destination: Arc<dyn RegistryApi>,
        engines: Arc<dyn EngineFactory>,
        output: Logger,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            engines,
            output,
            validate_queue: Arc::new(WorkQueue::new()),
            good_queue: Arc::new(WorkQueue::new()),
        }
    }

    /// Execute one run. Only fatal preconditions and configuration errors
    /// are returned; per-image failures end up in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let started = Instant::now();

        self.output.section("Registry Sync");
        self.output.info(&format!(
            "{} -> {} ({})",
            self.config.source,
            self.config.destination,
            self.config.mode.description()
        ));
        self.output
            .verbose(&format!("Workers per stage: {}", self.config.concurrency));
        if self.config.dry_run {
            self.output.info("Dry run: nothing will be transferred or deleted");
        }

        let mut summary = match self.config.mode {
            RunMode::Purge => self.run_purge().await?,
            RunMode::Sync { no_diff } => self.run_sync(no_diff).await?,
        };

        summary.total_time = started.elapsed();
        summary.log(&self.output);
        Ok(summary)
    }

    fn enumerator(&self) -> CatalogEnumerator {
        CatalogEnumerator::new(self.output.clone())
            .with_page_size(self.config.catalog_page_size)
            .with_concurrency(self.config.concurrency)
    }

    /// Enumerate both registries concurrently
    async fn enumerate_both(&self) -> Result<(ImageRefSet, ImageRefSet)> {
        let enumerator = self.enumerator();
        let (source, destination) = tokio::join!(
            enumerator.enumerate(self.source.as_ref()),
            enumerator.enumerate(self.destination.as_ref())
        );
        Ok((source?, destination?))
    }

    async fn run_sync(&self, no_diff: bool) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        self.output.subsection("Enumerating registries");
        let candidates = if no_diff {
            self.enumerator().enumerate(self.source.as_ref()).await?
        } else {
            let (source, destination) = self.enumerate_both().await?;
            diff(&source, &destination)
        };
        summary.candidates = candidates.len();
        self.output
            .info(&format!("{} images to validate", candidates.len()));

        if candidates.is_empty() {
            self.output.success("Destination is up to date");
            return Ok(summary);
        }

        self.output.subsection("Validating manifests");
        for image in candidates.sorted() {
            self.validate_queue.push(image);
        }
        let validation_started = Instant::now();
        let results = ManifestValidator::new(Arc::clone(&self.source), self.output.clone())
            .with_concurrency(self.config.concurrency)
            .with_poll_timeout(self.config.poll_timeout)
            .run(Arc::clone(&self.validate_queue), Arc::clone(&self.good_queue))
            .await;
        summary.record_validation(&results, validation_started.elapsed());
        self.output.info(&format!(
            "{} of {} images validated in {}",
            summary.validated_good,
            results.len(),
            self.output.format_duration(summary.validation_time)
        ));

        if self.config.print_list {
            let mut good: Vec<&ImageRef> = results
                .iter()
                .filter(|r| r.is_good())
                .map(|r| &r.image)
                .collect();
            good.sort();
            let lines: Vec<String> = good.iter().map(|image| image.to_string()).collect();
            self.output.list("Verified images", &lines);
        }

        if self.config.dry_run {
            return Ok(summary);
        }

        let queued = self.good_queue.len();
        if queued == 0 {
            self.output.warning("No verified images to sync");
            return Ok(summary);
        }

        self.output.subsection("Syncing images");
        self.output.info(&format!("{} images in sync queue", queued));
        let outcomes = SyncEngine::new(
            self.config.source.host.clone(),
            self.config.destination.host.clone(),
            Arc::clone(&self.engines),
            self.output.clone(),
        )
        .with_concurrency(self.config.concurrency)
        .with_poll_timeout(self.config.poll_timeout)
        .run(Arc::clone(&self.good_queue))
        .await;

        summary.record_sync(&outcomes, queued);
        if !self.good_queue.is_empty() {
            self.output.warning(&format!(
                "{} verified images were left unsynced",
                self.good_queue.len()
            ));
        }
        Ok(summary)
    }

    async fn run_purge(&self) -> Result<RunSummary> {
        let mut summary = RunSummary {
            purge_mode: true,
            ..RunSummary::default()
        };

        self.output.subsection("Enumerating registries");
        let (source, destination) = self.enumerate_both().await?;
        let candidates = PurgeEngine::candidates(&source, &destination);
        summary.purge_candidates = candidates.len();

        if candidates.is_empty() {
            self.output.success("Nothing to purge");
            return Ok(summary);
        }

        if self.config.dry_run {
            let lines: Vec<String> = candidates.iter().map(|c| c.image.to_string()).collect();
            self.output.list("Images to purge", &lines);
            return Ok(summary);
        }

        self.output.subsection("Purging images");
        let outcomes = PurgeEngine::new(Arc::clone(&self.destination), self.output.clone())
            .with_concurrency(self.config.concurrency)
            .with_poll_timeout(self.config.poll_timeout)
            .run(candidates, &PurgeEngine::kept(&source, &destination))
            .await;
        summary.record_purge(&outcomes);
        Ok(summary)
    }
}
