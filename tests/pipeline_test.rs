mod common;

use common::{DESTINATION_HOST, FakeEngineFactory, FakeRegistry, SOURCE_HOST, test_config};
use registry_sync::engine::EngineFactory;
use registry_sync::registry::RegistryApi;
use registry_sync::sync::SyncPipeline;
use registry_sync::{ErrorKind, Logger, RunMode, SyncConfig, SyncError};
use std::sync::Arc;

fn scenario_source() -> FakeRegistry {
    FakeRegistry::new(SOURCE_HOST)
        .with_image("app", "v1", &["sha256:app-base"])
        .with_image("app", "v2", &["sha256:app-base", "sha256:app-v2"])
        .with_missing_manifest("lib", "v3")
}

fn scenario_destination() -> FakeRegistry {
    FakeRegistry::new(DESTINATION_HOST)
        .with_image("app", "v1", &["sha256:app-base"])
        .with_image("old", "v0", &["sha256:old"])
}

fn pipeline(
    config: SyncConfig,
    source: &Arc<FakeRegistry>,
    destination: &Arc<FakeRegistry>,
    engines: &FakeEngineFactory,
) -> SyncPipeline {
    let source: Arc<dyn RegistryApi> = source.clone();
    let destination: Arc<dyn RegistryApi> = destination.clone();
    let engines: Arc<dyn EngineFactory> = Arc::new(engines.clone());
    SyncPipeline::new(config, source, destination, engines, Logger::new_quiet())
}

#[tokio::test]
async fn test_only_missing_valid_images_are_synced() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::new();

    let summary = pipeline(test_config().with_concurrency(2), &source, &destination, &engines)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.validated_good, 1);
    assert_eq!(summary.validated_bad, 1);
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.sync_failed, 0);
    assert_eq!(
        engines.calls(),
        vec![
            "pull src.example.com/app:v2",
            "tag src.example.com/app:v2 dst.example.com/app:v2",
            "push dst.example.com/app:v2",
            "rm dst.example.com/app:v2",
            "rm src.example.com/app:v2",
        ]
    );
    assert!(destination.deleted().is_empty());
}

#[tokio::test]
async fn test_second_run_has_no_candidates() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::pushing_to(Arc::clone(&destination));

    let first = pipeline(test_config(), &source, &destination, &engines)
        .run()
        .await
        .unwrap();
    assert_eq!(first.synced, 1);
    assert!(destination.contains("app", "v2"));

    // lib:v3 never validates, so only a fixed source gives an empty diff
    let fixed_source = Arc::new(
        FakeRegistry::new(SOURCE_HOST)
            .with_image("app", "v1", &["sha256:app-base"])
            .with_image("app", "v2", &["sha256:app-base", "sha256:app-v2"]),
    );
    let engines = FakeEngineFactory::pushing_to(Arc::clone(&destination));
    let second = pipeline(test_config(), &fixed_source, &destination, &engines)
        .run()
        .await
        .unwrap();
    assert_eq!(second.candidates, 0);
    assert!(engines.calls().is_empty());
}

#[tokio::test]
async fn test_dry_run_validates_without_transfer() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::new();

    let config = test_config().with_dry_run(true).with_print_list(true);
    let summary = pipeline(config, &source, &destination, &engines)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.validated_good, 1);
    assert_eq!(summary.synced, 0);
    assert!(engines.calls().is_empty());
    assert_eq!(engines.connects(), 0);
}

#[tokio::test]
async fn test_no_diff_offers_every_source_image() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(
        FakeRegistry::new(DESTINATION_HOST).with_catalog_error(SyncError::Api("unreachable".into())),
    );
    let engines = FakeEngineFactory::new();

    let config = test_config().with_mode(RunMode::Sync { no_diff: true });
    let summary = pipeline(config, &source, &destination, &engines)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.validated_good, 2);
    assert_eq!(summary.synced, 2);
}

#[tokio::test]
async fn test_catalog_failure_is_fatal() {
    let source = Arc::new(
        FakeRegistry::new(SOURCE_HOST).with_catalog_error(SyncError::Transient("connection reset".into())),
    );
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::new();

    let err = pipeline(test_config(), &source, &destination, &engines)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FatalPrecondition);
    assert_eq!(err.exit_code(), 1);
    assert!(engines.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_any_request() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::new();

    let err = pipeline(test_config().with_concurrency(0), &source, &destination, &engines)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(source.manifest_fetches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_dry_run_only_lists() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::new();

    let config = test_config().with_mode(RunMode::Purge).with_dry_run(true);
    let summary = pipeline(config, &source, &destination, &engines)
        .run()
        .await
        .unwrap();

    assert!(summary.purge_mode);
    assert_eq!(summary.purge_candidates, 1);
    assert_eq!(summary.purged, 0);
    assert!(destination.deleted().is_empty());
    assert!(destination.contains("old", "v0"));
}

#[tokio::test]
async fn test_purge_deletes_by_digest_and_never_syncs() {
    let source = Arc::new(scenario_source());
    let destination = Arc::new(scenario_destination());
    let engines = FakeEngineFactory::new();

    let config = test_config().with_mode(RunMode::Purge).with_concurrency(3);
    let summary = pipeline(config, &source, &destination, &engines)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.purge_candidates, 1);
    assert_eq!(summary.purged, 1);
    assert_eq!(summary.purge_failed, 0);
    assert_eq!(
        destination.deleted(),
        vec![("old".to_string(), "sha256:manifest-old-v0".to_string())]
    );
    assert!(destination.contains("app", "v1"));

    assert!(engines.calls().is_empty());
    assert_eq!(engines.connects(), 0);
    assert!(source.manifest_fetches.lock().unwrap().is_empty());
    assert_eq!(summary.synced, 0);
}
