//! In-memory registry and container engine used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use registry_sync::engine::{ContainerEngine, EngineFactory};
use registry_sync::image::Manifest;
use registry_sync::registry::RegistryApi;
use registry_sync::{ImageRef, RegistryEndpoint, Result, SyncConfig, SyncError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SOURCE_HOST: &str = "src.example.com";
pub const DESTINATION_HOST: &str = "dst.example.com";
pub const POLL: Duration = Duration::from_millis(100);

pub fn test_config() -> SyncConfig {
    SyncConfig::new(
        RegistryEndpoint::parse(SOURCE_HOST, false).unwrap(),
        RegistryEndpoint::parse(DESTINATION_HOST, false).unwrap(),
    )
    .with_poll_timeout(POLL)
}

#[derive(Debug, Clone)]
struct StoredImage {
    manifest: String,
    digest: String,
}

fn manifest_digest(repository: &str, tag: &str) -> String {
    format!("sha256:manifest-{}-{}", repository.replace('/', "-"), tag)
}

fn config_digest(repository: &str, tag: &str) -> String {
    format!("sha256:config-{}-{}", repository.replace('/', "-"), tag)
}

fn schema2_manifest(config: &str, layers: &[&str]) -> String {
    let layers: Vec<String> = layers
        .iter()
        .map(|digest| {
            format!(
                r#"{{"mediaType":"application/vnd.docker.image.rootfs.diff.tar.gzip","size":1,"digest":"{}"}}"#,
                digest
            )
        })
        .collect();
    format!(
        r#"{{"schemaVersion":2,"mediaType":"application/vnd.docker.distribution.manifest.v2+json","config":{{"mediaType":"application/vnd.docker.container.image.v1+json","size":1,"digest":"{}"}},"layers":[{}]}}"#,
        config,
        layers.join(",")
    )
}

/// Registry held entirely in memory. Repositories map tags to manifests;
/// blobs live in one shared pool.
#[derive(Default)]
pub struct FakeRegistry {
    host: String,
    repositories: Mutex<BTreeMap<String, BTreeMap<String, StoredImage>>>,
    blobs: Mutex<HashSet<String>>,
    missing_manifests: Mutex<HashSet<(String, String)>>,
    unresolvable: HashSet<(String, String)>,
    failing_tag_lists: HashSet<String>,
    catalog_error: Option<SyncError>,
    pub blob_probes: Mutex<Vec<String>>,
    pub manifest_fetches: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<(String, String)>>,
}

impl FakeRegistry {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    /// Image with a schema 2 manifest whose config and layer blobs exist
    pub fn with_image(self, repository: &str, tag: &str, layers: &[&str]) -> Self {
        self.insert_image(repository, tag, layers);
        self
    }

    /// Listed in the tag list, but its manifest answers 404
    pub fn with_missing_manifest(self, repository: &str, tag: &str) -> Self {
        self.insert_image(repository, tag, &[]);
        self.missing_manifests
            .lock()
            .unwrap()
            .insert((repository.to_string(), tag.to_string()));
        self
    }

    pub fn with_raw_manifest(self, repository: &str, tag: &str, manifest: &str, blobs: &[&str]) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default()
            .insert(
                tag.to_string(),
                StoredImage {
                    manifest: manifest.to_string(),
                    digest: manifest_digest(repository, tag),
                },
            );
        self.blobs
            .lock()
            .unwrap()
            .extend(blobs.iter().map(|b| b.to_string()));
        self
    }

    /// Digest lookups for this tag fail as if the header were missing
    pub fn with_unresolvable_digest(mut self, repository: &str, tag: &str) -> Self {
        self.unresolvable
            .insert((repository.to_string(), tag.to_string()));
        self
    }

    /// Second tag pointing at the manifest of `target`
    pub fn with_tag_alias(self, repository: &str, tag: &str, target: &str) -> Self {
        {
            let mut repositories = self.repositories.lock().unwrap();
            let tags = repositories.entry(repository.to_string()).or_default();
            let image = tags.get(target).cloned().expect("alias target exists");
            tags.insert(tag.to_string(), image);
        }
        self
    }

    pub fn without_blob(self, digest: &str) -> Self {
        self.blobs.lock().unwrap().remove(digest);
        self
    }

    /// Repository in the catalog whose tag list is null
    pub fn with_empty_repository(self, repository: &str) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default();
        self
    }

    pub fn with_failing_tag_list(mut self, repository: &str) -> Self {
        self.failing_tag_lists.insert(repository.to_string());
        self.repositories
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default();
        self
    }

    pub fn with_catalog_error(mut self, error: SyncError) -> Self {
        self.catalog_error = Some(error);
        self
    }

    pub fn insert_image(&self, repository: &str, tag: &str, layers: &[&str]) {
        let config = config_digest(repository, tag);
        let manifest = schema2_manifest(&config, layers);

        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert(config);
        blobs.extend(layers.iter().map(|l| l.to_string()));

        self.repositories
            .lock()
            .unwrap()
            .entry(repository.to_string())
            .or_default()
            .insert(
                tag.to_string(),
                StoredImage {
                    manifest,
                    digest: manifest_digest(repository, tag),
                },
            );
    }

    pub fn contains(&self, repository: &str, tag: &str) -> bool {
        self.repositories
            .lock()
            .unwrap()
            .get(repository)
            .is_some_and(|tags| tags.contains_key(tag))
    }

    pub fn images(&self) -> Vec<ImageRef> {
        let repositories = self.repositories.lock().unwrap();
        repositories
            .iter()
            .flat_map(|(repo, tags)| tags.keys().map(move |tag| ImageRef::new(repo.clone(), tag.clone())))
            .collect()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    fn lookup(&self, repository: &str, reference: &str) -> Result<StoredImage> {
        let repositories = self.repositories.lock().unwrap();
        let tags = repositories
            .get(repository)
            .ok_or_else(|| SyncError::NotFound(format!("repository {}", repository)))?;
        if let Some(image) = tags.get(reference) {
            return Ok(image.clone());
        }
        tags.values()
            .find(|image| image.digest == reference)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("manifest {}:{}", repository, reference)))
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list_repositories(&self, _page_size: usize) -> Result<Vec<String>> {
        if let Some(e) = &self.catalog_error {
            return Err(e.clone());
        }
        Ok(self.repositories.lock().unwrap().keys().cloned().collect())
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        if self.failing_tag_lists.contains(repository) {
            return Err(SyncError::Transient(format!("tag list for {} timed out", repository)));
        }
        let repositories = self.repositories.lock().unwrap();
        Ok(repositories
            .get(repository)
            .map(|tags| tags.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        self.manifest_fetches
            .lock()
            .unwrap()
            .push(format!("{}:{}", repository, reference));
        let missing = self
            .missing_manifests
            .lock()
            .unwrap()
            .contains(&(repository.to_string(), reference.to_string()));
        if missing {
            return Err(SyncError::NotFound(format!("manifest {}:{}", repository, reference)));
        }
        let image = self.lookup(repository, reference)?;
        Manifest::parse(image.manifest.as_bytes())
    }

    async fn probe_blob(&self, _repository: &str, digest: &str) -> Result<()> {
        self.blob_probes.lock().unwrap().push(digest.to_string());
        if self.blobs.lock().unwrap().contains(digest) {
            Ok(())
        } else {
            Err(SyncError::NotFound(format!("blob {}", digest)))
        }
    }

    async fn resolve_manifest_digest(&self, repository: &str, reference: &str) -> Result<String> {
        if self
            .unresolvable
            .contains(&(repository.to_string(), reference.to_string()))
        {
            return Err(SyncError::Api(format!(
                "No Docker-Content-Digest header for {}:{}",
                repository, reference
            )));
        }
        self.lookup(repository, reference).map(|image| image.digest)
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<u16> {
        let mut repositories = self.repositories.lock().unwrap();
        let tags = repositories
            .get_mut(repository)
            .ok_or_else(|| SyncError::NotFound(format!("repository {}", repository)))?;
        let before = tags.len();
        tags.retain(|_, image| image.digest != digest);
        if tags.len() == before {
            return Err(SyncError::NotFound(format!("manifest {}@{}", repository, digest)));
        }
        self.deleted
            .lock()
            .unwrap()
            .push((repository.to_string(), digest.to_string()));
        Ok(202)
    }
}

/// Shared state behind every engine handed out by a [`FakeEngineFactory`]
#[derive(Default)]
pub struct EngineState {
    pub calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, SyncError>>,
    destination: Option<Arc<FakeRegistry>>,
}

impl EngineState {
    fn call(&self, entry: String) -> Result<()> {
        self.calls.lock().unwrap().push(entry.clone());
        match self.failures.lock().unwrap().get(&entry) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub struct FakeEngine {
    state: Arc<EngineState>,
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn pull(&self, image: &str) -> Result<()> {
        self.state.call(format!("pull {}", image))
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.state.call(format!("tag {} {}", source, target))
    }

    async fn push(&self, image: &str) -> Result<()> {
        self.state.call(format!("push {}", image))?;
        if let Some(destination) = &self.state.destination {
            let name = image
                .strip_prefix(&format!("{}/", destination.host()))
                .unwrap_or(image);
            if let Some((repository, tag)) = name.rsplit_once(':') {
                destination.insert_image(repository, tag, &[]);
            }
        }
        Ok(())
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        self.state.call(format!("rm {}", image))
    }
}

#[derive(Clone, Default)]
pub struct FakeEngineFactory {
    pub state: Arc<EngineState>,
    pub connects: Arc<AtomicUsize>,
    refuse: bool,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes land as images in `destination`
    pub fn pushing_to(destination: Arc<FakeRegistry>) -> Self {
        Self {
            state: Arc::new(EngineState {
                destination: Some(destination),
                ..EngineState::default()
            }),
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Fail the call recorded as `entry`, e.g. `"push dst.example.com/app:v2"`
    pub fn fail(&self, entry: &str, error: SyncError) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(entry.to_string(), error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl EngineFactory for FakeEngineFactory {
    fn connect(&self) -> Result<Box<dyn ContainerEngine>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(SyncError::Api("engine endpoint refused connection".to_string()));
        }
        Ok(Box::new(FakeEngine {
            state: Arc::clone(&self.state),
        }))
    }
}
