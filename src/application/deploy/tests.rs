use super::*;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;

use crate::application::retry::RetryPolicy;
use crate::application::sync::SyncOptions;
use crate::domain::entities::DeploymentResult;
use crate::domain::ports::{DeployEvent, DeployEventSink, NoopEventSink, RecordingEventSink};
use crate::domain::services::InvalidationPolicy;
use crate::domain::value_objects::{
    DeployPhase, DeployStatus, ErrorKind, InvalidationPaths, ObjectKey,
};
use crate::infrastructure::cdn::MemoryCdn;
use crate::infrastructure::fs::LocalAssetSource;
use crate::infrastructure::store::{FlakyObjectStore, MemoryObjectStore};

fn site(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn key(k: &str) -> ObjectKey {
    ObjectKey::parse(k).unwrap()
}

fn options(dir: &TempDir) -> DeployOptions {
    DeployOptions::new(dir.path(), "site", "E2EXAMPLE").with_sync(SyncOptions {
        retry: RetryPolicy::new(3)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false),
        ..SyncOptions::default()
    })
}

fn explicit_policy() -> InvalidationPolicy {
    InvalidationPolicy::new(key("index.html"), 1.0)
}

struct Harness {
    store: Arc<MemoryObjectStore>,
    cdn: Arc<MemoryCdn>,
    use_case: DeployUseCase,
}

impl Harness {
    fn new() -> Self {
        Self::with_cdn(MemoryCdn::new())
    }

    fn with_cdn(cdn: MemoryCdn) -> Self {
        let store = Arc::new(MemoryObjectStore::new());
        let cdn = Arc::new(cdn);
        let use_case = DeployUseCase::new(Arc::new(LocalAssetSource::new()), store.clone())
            .with_cdn(cdn.clone());
        Self {
            store,
            cdn,
            use_case,
        }
    }

    async fn seed(&self, k: &str, content: &str) {
        let dir = site(&[(k, content)]);
        let seeding = DeployUseCase::new(Arc::new(LocalAssetSource::new()), self.store.clone());
        let result = seeding
            .execute(&options(&dir), Arc::new(NoopEventSink), &CancellationToken::new())
            .await;
        assert_eq!(result.status, DeployStatus::Succeeded);
    }

    async fn run(&self, options: &DeployOptions) -> (DeploymentResult, Arc<RecordingEventSink>) {
        let sink = Arc::new(RecordingEventSink::new());
        let events: Arc<dyn DeployEventSink> = sink.clone();
        let result = self
            .use_case
            .execute(options, events, &CancellationToken::new())
            .await;
        (result, sink)
    }
}

#[tokio::test]
async fn changed_new_and_removed_files_are_reconciled() {
    let harness = Harness::new();
    harness.seed("a.txt", "H1").await;
    harness.seed("c.txt", "H3").await;

    let dir = site(&[("a.txt", "H1"), ("b.txt", "H2")]);
    let opts = options(&dir)
        .with_prune(true)
        .with_invalidation(InvalidationPolicy::new(key("index.html"), 0.8));
    let (result, sink) = harness.run(&opts).await;

    assert_eq!(result.status, DeployStatus::Succeeded);
    assert_eq!(result.phase, DeployPhase::Done);
    assert_eq!(result.uploaded, vec![key("b.txt")]);
    assert_eq!(result.deleted, vec![key("c.txt")]);
    assert_eq!(result.skipped, 1);
    assert_eq!(harness.store.keys("site"), vec!["a.txt", "b.txt"]);

    let receipt = result.invalidation.expect("invalidation submitted");
    assert_eq!(receipt.paths, vec!["/b.txt", "/c.txt", "/index.html"]);
    assert_eq!(harness.cdn.request_count(), 1);

    assert_eq!(
        sink.phases(),
        vec![
            DeployPhase::Scanning,
            DeployPhase::Diffing,
            DeployPhase::Syncing,
            DeployPhase::Invalidating,
            DeployPhase::Done,
        ]
    );
    assert!(matches!(
        sink.events().last(),
        Some(DeployEvent::Completed {
            status: DeployStatus::Succeeded,
            uploaded: 1,
            deleted: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn large_change_set_collapses_to_wildcard() {
    let harness = Harness::new();
    harness.seed("a.txt", "H1").await;
    harness.seed("c.txt", "H3").await;

    let dir = site(&[("a.txt", "H1"), ("b.txt", "H2")]);
    let (result, _) = harness.run(&options(&dir).with_prune(true)).await;

    let receipt = result.invalidation.unwrap();
    assert_eq!(receipt.paths, vec!["/*"]);
}

#[tokio::test]
async fn without_prune_remote_only_objects_are_retained() {
    let harness = Harness::new();
    harness.seed("legacy.html", "old").await;

    let dir = site(&[("index.html", "new")]);
    let (result, _) = harness.run(&options(&dir)).await;

    assert_eq!(result.status, DeployStatus::Succeeded);
    assert!(result.deleted.is_empty());
    assert_eq!(result.retained, 1);
    assert_eq!(harness.store.keys("site"), vec!["index.html", "legacy.html"]);
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let harness = Harness::new();
    let dir = site(&[("index.html", "<h1>hi</h1>"), ("css/site.css", "body{}")]);
    let opts = options(&dir).with_prune(true);

    let (first, _) = harness.run(&opts).await;
    assert_eq!(first.uploaded.len(), 2);
    assert_eq!(harness.cdn.request_count(), 1);

    let (second, sink) = harness.run(&opts).await;
    assert_eq!(second.status, DeployStatus::Succeeded);
    assert!(second.uploaded.is_empty());
    assert!(second.deleted.is_empty());
    assert_eq!(second.skipped, 2);
    assert!(second.invalidation.is_none());
    assert_eq!(harness.cdn.request_count(), 1);
    assert_eq!(
        sink.phases(),
        vec![DeployPhase::Scanning, DeployPhase::Diffing, DeployPhase::Done]
    );
}

#[tokio::test]
async fn dry_run_reports_plan_without_mutation() {
    let harness = Harness::new();
    harness.seed("stale.html", "old").await;

    let dir = site(&[("index.html", "new")]);
    let (result, sink) = harness
        .run(&options(&dir).with_prune(true).with_dry_run(true))
        .await;

    assert_eq!(result.status, DeployStatus::Succeeded);
    assert!(result.dry_run);
    let plan = result.plan.expect("dry run keeps the plan");
    assert_eq!(plan.to_upload.len(), 1);
    assert_eq!(plan.to_delete.len(), 1);
    assert!(result.uploaded.is_empty());
    assert_eq!(harness.store.keys("site"), vec!["stale.html"]);
    assert_eq!(harness.cdn.request_count(), 0);
    assert_eq!(
        sink.phases(),
        vec![DeployPhase::Scanning, DeployPhase::Diffing, DeployPhase::Done]
    );
}

#[tokio::test(start_paused = true)]
async fn partial_failure_invalidates_only_successes() {
    let files: Vec<(String, String)> = (0..10)
        .map(|i| (format!("page{}.html", i), format!("content {}", i)))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let dir = site(&refs);

    let inner = Arc::new(MemoryObjectStore::new());
    let cdn = Arc::new(MemoryCdn::new());
    let flaky = Arc::new(FlakyObjectStore::new(inner.clone()).fail_put_always("page3.html"));
    let use_case =
        DeployUseCase::new(Arc::new(LocalAssetSource::new()), flaky).with_cdn(cdn.clone());

    let result = use_case
        .execute(
            &options(&dir).with_invalidation(explicit_policy()),
            Arc::new(NoopEventSink),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.status, DeployStatus::PartiallyFailed);
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.phase, DeployPhase::Done);
    assert_eq!(result.uploaded.len(), 9);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].key, key("page3.html"));
    assert_eq!(result.errors[0].attempts, 3);

    let paths = cdn.invalidated_paths("E2EXAMPLE");
    assert_eq!(paths.len(), 10);
    assert!(!paths.contains(&"/page3.html".to_string()));
    assert!(paths.contains(&"/index.html".to_string()));
}

#[tokio::test]
async fn missing_source_fails_before_any_mutation() {
    let harness = Harness::new();
    harness.seed("keep.html", "x").await;

    let dir = tempdir().unwrap();
    let opts = DeployOptions::new(dir.path().join("does-not-exist"), "site", "E2EXAMPLE")
        .with_prune(true);
    let (result, sink) = harness.run(&opts).await;

    assert_eq!(result.status, DeployStatus::Failed);
    assert_eq!(result.exit_code(), 2);
    assert_eq!(result.phase, DeployPhase::Failed);
    let failure = result.failure.unwrap();
    assert_eq!(failure.phase, DeployPhase::Scanning);
    assert_eq!(harness.store.keys("site"), vec!["keep.html"]);
    assert_eq!(harness.cdn.request_count(), 0);
    assert_eq!(
        sink.phases(),
        vec![DeployPhase::Scanning, DeployPhase::Failed]
    );
}

#[tokio::test]
async fn denied_inventory_is_fatal() {
    let flaky = Arc::new(FlakyObjectStore::new(Arc::new(MemoryObjectStore::new())).deny_listing());
    let cdn = Arc::new(MemoryCdn::new());
    let use_case =
        DeployUseCase::new(Arc::new(LocalAssetSource::new()), flaky.clone()).with_cdn(cdn.clone());

    let dir = site(&[("index.html", "x")]);
    let result = use_case
        .execute(&options(&dir), Arc::new(NoopEventSink), &CancellationToken::new())
        .await;

    assert_eq!(result.status, DeployStatus::Failed);
    assert_eq!(result.failure.unwrap().kind, ErrorKind::Permission);
    assert_eq!(flaky.put_attempts("index.html"), 0);
    assert_eq!(cdn.request_count(), 0);
}

#[tokio::test]
async fn invalidation_failure_is_a_warning() {
    let harness = Harness::with_cdn(MemoryCdn::new().deny());
    let dir = site(&[("index.html", "x")]);

    let (result, sink) = harness.run(&options(&dir)).await;

    assert_eq!(result.status, DeployStatus::Succeeded);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.uploaded.len(), 1);
    assert!(result.invalidation.is_none());
    assert_eq!(result.warnings.len(), 1);
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, DeployEvent::InvalidationFailed { .. })));
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let harness = Harness::new();
    let dir = site(&[("index.html", "x")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = harness
        .use_case
        .execute(&options(&dir), Arc::new(NoopEventSink), &cancel)
        .await;

    assert_eq!(result.status, DeployStatus::Cancelled);
    assert_eq!(result.exit_code(), 2);
    assert_eq!(result.phase, DeployPhase::Scanning);
    assert!(harness.store.is_empty("site"));
}

#[tokio::test(start_paused = true)]
async fn deadline_cancels_remaining_transfers() {
    let dir = site(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);
    let inner = Arc::new(MemoryObjectStore::new());
    let cdn = Arc::new(MemoryCdn::new());
    let slow = Arc::new(
        FlakyObjectStore::new(inner.clone()).with_put_delay(Duration::from_secs(10)),
    );
    let use_case =
        DeployUseCase::new(Arc::new(LocalAssetSource::new()), slow).with_cdn(cdn.clone());

    let opts = options(&dir)
        .with_concurrency(1)
        .with_run_deadline(Some(Duration::from_secs(1)));
    let result = use_case
        .execute(&opts, Arc::new(NoopEventSink), &CancellationToken::new())
        .await;

    assert_eq!(result.status, DeployStatus::Cancelled);
    assert_eq!(result.exit_code(), 2);
    assert_eq!(result.phase, DeployPhase::Invalidating);
    assert_eq!(result.uploaded, vec![key("a.txt")]);
    assert_eq!(inner.len("site"), 1);
    assert_eq!(cdn.request_count(), 1);
    assert_eq!(cdn.invalidated_paths("E2EXAMPLE"), vec!["/a.txt", "/index.html"]);
    assert!(result.invalidation.is_some());
    assert!(result.warnings.iter().any(|w| w.contains("deadline")));
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_submits_invalidation_once_without_retry() {
    let dir = site(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);
    let inner = Arc::new(MemoryObjectStore::new());
    let cdn = Arc::new(MemoryCdn::new().fail_next(1));
    let slow = Arc::new(
        FlakyObjectStore::new(inner.clone()).with_put_delay(Duration::from_secs(10)),
    );
    let use_case =
        DeployUseCase::new(Arc::new(LocalAssetSource::new()), slow).with_cdn(cdn.clone());

    let opts = options(&dir)
        .with_concurrency(1)
        .with_run_deadline(Some(Duration::from_secs(1)));
    let result = use_case
        .execute(&opts, Arc::new(NoopEventSink), &CancellationToken::new())
        .await;

    assert_eq!(result.status, DeployStatus::Cancelled);
    assert_eq!(result.uploaded, vec![key("a.txt")]);
    assert_eq!(cdn.request_count(), 0);
    assert!(result.invalidation.is_none());
    assert!(result.warnings.iter().any(|w| w.contains("invalidation")));
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_without_cdn_reports_cancelled() {
    let dir = site(&[("a.txt", "a"), ("b.txt", "b")]);
    let inner = Arc::new(MemoryObjectStore::new());
    let slow = Arc::new(
        FlakyObjectStore::new(inner.clone()).with_put_delay(Duration::from_secs(10)),
    );
    let use_case = DeployUseCase::new(Arc::new(LocalAssetSource::new()), slow);

    let opts = options(&dir)
        .with_concurrency(1)
        .with_run_deadline(Some(Duration::from_secs(1)));
    let result = use_case
        .execute(&opts, Arc::new(NoopEventSink), &CancellationToken::new())
        .await;

    assert_eq!(result.status, DeployStatus::Cancelled);
    assert_eq!(result.phase, DeployPhase::Syncing);
    assert_eq!(result.uploaded, vec![key("a.txt")]);
}

#[tokio::test]
async fn runs_without_cdn_skip_invalidation() {
    let store = Arc::new(MemoryObjectStore::new());
    let use_case = DeployUseCase::new(Arc::new(LocalAssetSource::new()), store.clone());
    let dir = site(&[("index.html", "x")]);

    let result = use_case
        .execute(&options(&dir), Arc::new(NoopEventSink), &CancellationToken::new())
        .await;

    assert_eq!(result.status, DeployStatus::Succeeded);
    assert!(result.invalidation.is_none());
    assert_eq!(store.len("site"), 1);
}

#[tokio::test]
async fn plan_reports_duplicates_and_paths() {
    let harness = Harness::new();
    let dir = site(&[("a/logo.png", "same"), ("b/logo.png", "same"), ("index.html", "x")]);
    let opts = options(&dir).with_invalidation(explicit_policy());

    let outcome = harness
        .use_case
        .plan(&opts, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.assets.len(), 3);
    assert!(outcome.remote.is_empty());
    assert_eq!(outcome.duplicates.len(), 1);
    assert_eq!(outcome.plan.to_upload.len(), 3);
    assert!(matches!(
        outcome.plan.invalidation,
        InvalidationPaths::Explicit(ref paths) if paths.len() == 3
    ));
    assert!(harness.store.is_empty("site"));
}
