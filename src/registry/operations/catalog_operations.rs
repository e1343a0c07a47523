//! Catalog operations for registry client
//!
//! Implements Docker Registry v2 listing endpoints:
//! - Repository catalog (GET /v2/_catalog?n={page})
//! - Tag listing (GET /v2/{name}/tags/list)

use super::{read_json, send};
use crate::error::{Result, SyncError};
use crate::logging::Logger;
use reqwest::Client;
use reqwest::header::LINK;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    repositories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TagListResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct CatalogOperations {
    client: Client,
    address: String,
    output: Logger,
}

impl CatalogOperations {
    pub fn new(client: Client, address: String, output: Logger) -> Self {
        Self {
            client,
            address,
            output,
        }
    }

    /// List every repository, following `Link: <...>; rel="next"` pages
    /// until the registry stops sending one.
    pub async fn list_repositories(&self, page_size: usize) -> Result<Vec<String>> {
        let mut url = format!("{}/v2/_catalog?n={}", self.address, page_size);
        let mut visited = HashSet::new();
        let mut repositories = Vec::new();

        loop {
            self.output.verbose(&format!("Fetching catalog: {}", url));
            visited.insert(url.clone());

            let response = send(self.client.get(&url), "catalog fetch").await?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_link);
            let catalog: CatalogResponse = read_json(response, "catalog fetch").await?;

            let page = catalog.repositories.ok_or_else(|| {
                SyncError::Api("Catalog response has no repositories field".to_string())
            })?;
            let page_len = page.len();
            repositories.extend(page);

            let Some(next) = next else {
                if page_len >= page_size {
                    self.output.warning(&format!(
                        "Catalog page of {} holds {} entries, the page size limit, without a next link; the listing may be incomplete",
                        self.address, page_len
                    ));
                }
                break;
            };

            url = self.resolve_link(&next)?;
            if visited.contains(&url) {
                return Err(SyncError::Api(format!(
                    "Catalog pagination of {} loops back to {}",
                    self.address, url
                )));
            }
            self.output.detail(&format!(
                "Catalog continues at {} ({} repositories so far)",
                url,
                repositories.len()
            ));
        }

        Ok(repositories)
    }

    fn resolve_link(&self, target: &str) -> Result<String> {
        Url::parse(&self.address)
            .and_then(|base| base.join(target))
            .map(String::from)
            .map_err(|e| {
                SyncError::Api(format!("Invalid catalog next link '{}': {}", target, e))
            })
    }

    /// List tags of one repository. A repository without tags yields an
    /// empty list.
    pub async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let url = format!("{}/v2/{}/tags/list", self.address, repository);
        self.output.verbose(&format!("Listing tags for repository: {}", repository));

        let response = send(self.client.get(&url), "tag listing").await?;
        let tag_list: TagListResponse = read_json(response, "tag listing").await?;

        if let Some(name) = &tag_list.name {
            if name != repository {
                self.output.detail(&format!(
                    "Tag list for {} reports repository name {}",
                    repository, name
                ));
            }
        }

        Ok(tag_list.tags.unwrap_or_default())
    }
}

/// Target of the `rel="next"` entry of a `Link` header
pub(crate) fn next_page_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let (target, params) = entry.trim().split_once(';')?;
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let is_next = params.split(';').any(|param| {
            let param = param.trim();
            param.eq_ignore_ascii_case("rel=\"next\"") || param.eq_ignore_ascii_case("rel=next")
        });
        is_next.then(|| target.to_string())
    })
}
