//! Catalog enumeration
//!
//! Walks a registry's repository/tag space into an [`ImageRefSet`].

use crate::config::DEFAULT_CATALOG_PAGE_SIZE;
use crate::error::Result;
use crate::image::{ImageRef, ImageRefSet};
use crate::logging::Logger;
use crate::registry::RegistryApi;
use futures::stream::{self, StreamExt};

pub struct CatalogEnumerator {
    page_size: usize,
    concurrency: usize,
    output: Logger,
}

impl CatalogEnumerator {
    pub fn new(output: Logger) -> Self {
        Self {
            page_size: DEFAULT_CATALOG_PAGE_SIZE,
            concurrency: 1,
            output,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Maximum number of tag-list requests in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Enumerate every `(repository, tag)` of `registry`.
    ///
    /// Fails only when the catalog itself cannot be fetched; a repository
    /// whose tag list fails is skipped with a warning.
    pub async fn enumerate(&self, registry: &dyn RegistryApi) -> Result<ImageRefSet> {
        let host = registry.host().to_string();
        self.output.step(&format!("Creating repo list for: {}", host));

        let repositories = registry
            .list_repositories(self.page_size)
            .await
            .map_err(|e| e.into_fatal(&format!("Catalog fetch from {}", host)))?;

        self.output.verbose(&format!(
            "{} repositories in catalog of {}",
            repositories.len(),
            host
        ));

        let tag_lists: Vec<_> = stream::iter(repositories)
            .map(|repository| async move {
                let tags = registry.list_tags(&repository).await;
                (repository, tags)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut images = ImageRefSet::new();
        let mut skipped = 0usize;
        for (repository, tags) in tag_lists {
            match tags {
                Ok(tags) => {
                    images.extend(tags.into_iter().map(|tag| ImageRef::new(repository.clone(), tag)));
                }
                Err(e) => {
                    skipped += 1;
                    self.output.warning(&format!(
                        "Skipping repository {} on {} ({}): {}",
                        repository,
                        host,
                        e.kind(),
                        e
                    ));
                }
            }
        }

        let mut message = format!("{} images found on {}", images.len(), host);
        if skipped > 0 {
            message.push_str(&format!(" ({} repositories skipped)", skipped));
        }
        self.output.info(&message);

        Ok(images)
    }
}
