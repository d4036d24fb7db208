use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_test::assert_ok;

use crate::error::Error;
use crate::manager::DownloadManager;
use crate::manager::test_helpers::{MockBehavior, MockFetcher};
use crate::types::DownloadRequest;

const URL_A: &str = "https://youtu.be/aaaaaaaaaaa";
const URL_B: &str = "https://youtu.be/bbbbbbbbbbb";

fn manager_with(behavior: MockBehavior) -> (DownloadManager, TempDir) {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new("clip", behavior));
    (DownloadManager::new(fetcher), dir)
}

fn request(url: &str, dir: &TempDir) -> DownloadRequest {
    DownloadRequest::new(url, dir.path())
}

/// Poll until the worker for `url` has removed itself from the registry.
async fn wait_until_inactive(manager: &DownloadManager, url: &str) {
    for _ in 0..500 {
        if !manager.is_active(url) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("worker for {url} did not terminate in time");
}

// --- registry lifecycle ---

#[tokio::test]
async fn start_registers_the_identifier() {
    let (manager, dir) = manager_with(MockBehavior::RunUntilAborted);

    assert_ok!(manager.start(request(URL_A, &dir)));

    assert!(manager.is_active(URL_A));
    assert_eq!(manager.active_count(), 1);

    manager.stop_all().await;
}

#[tokio::test]
async fn completed_worker_removes_its_own_entry() {
    let (manager, dir) = manager_with(MockBehavior::Succeed { frames: 2 });

    assert_ok!(manager.start(request(URL_A, &dir)));
    wait_until_inactive(&manager, URL_A).await;

    assert_eq!(manager.active_count(), 0);
}

#[tokio::test]
async fn duplicate_start_is_rejected_and_original_keeps_running() {
    let (manager, dir) = manager_with(MockBehavior::RunUntilAborted);

    assert_ok!(manager.start(request(URL_A, &dir)));
    let second = manager.start(request(URL_A, &dir));

    match second {
        Err(Error::DuplicateRequest(id)) => assert_eq!(id, URL_A),
        other => panic!("expected DuplicateRequest, got {other:?}"),
    }
    assert!(
        manager.is_active(URL_A),
        "the original worker must keep its registry entry"
    );
    assert_eq!(manager.active_count(), 1);

    manager.stop_all().await;
}

#[tokio::test]
async fn distinct_identifiers_run_concurrently() {
    let (manager, dir) = manager_with(MockBehavior::RunUntilAborted);

    assert_ok!(manager.start(request(URL_A, &dir)));
    assert_ok!(manager.start(request(URL_B, &dir)));

    assert!(manager.is_active(URL_A));
    assert!(manager.is_active(URL_B));
    assert_eq!(manager.active_count(), 2);

    manager.stop_all().await;
}

// --- stop_all ---

#[tokio::test]
async fn stop_all_joins_every_worker_and_clears_the_registry() {
    let (manager, dir) = manager_with(MockBehavior::RunUntilAborted);

    assert_ok!(manager.start(request(URL_A, &dir)));
    assert_ok!(manager.start(request(URL_B, &dir)));

    // Let both workers enter their transfer loops
    tokio::time::sleep(Duration::from_millis(20)).await;

    manager.stop_all().await;

    // stop_all has join semantics: by the time it returns, both workers are
    // gone and the registry is empty.
    assert_eq!(manager.active_count(), 0);
    assert!(!manager.is_active(URL_A));
    assert!(!manager.is_active(URL_B));
}

#[tokio::test]
async fn stop_all_surfaces_cancelled_events_not_failures() {
    let (manager, dir) = manager_with(MockBehavior::RunUntilAborted);

    assert_ok!(manager.start(request(URL_A, &dir)));
    assert_ok!(manager.start(request(URL_B, &dir)));
    tokio::time::sleep(Duration::from_millis(20)).await;

    manager.stop_all().await;

    let mut cancelled = Vec::new();
    let mut failed = Vec::new();
    let mut completed = Vec::new();
    manager.drain(
        |_, _| {},
        |id, _| completed.push(id.to_string()),
        |id, _| failed.push(id.to_string()),
        |id| cancelled.push(id.to_string()),
    );

    cancelled.sort();
    assert_eq!(cancelled, vec![URL_A.to_string(), URL_B.to_string()]);
    assert!(failed.is_empty(), "cancellation must not be reported as failure");
    assert!(completed.is_empty());
}

#[tokio::test]
async fn stop_all_with_no_workers_is_a_no_op() {
    let (manager, _dir) = manager_with(MockBehavior::RunUntilAborted);
    manager.stop_all().await;
    assert_eq!(manager.active_count(), 0);
}

#[tokio::test]
async fn manager_is_reusable_after_stop_all() {
    let (manager, dir) = manager_with(MockBehavior::RunUntilAborted);

    assert_ok!(manager.start(request(URL_A, &dir)));
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.stop_all().await;

    // The stop token was replaced, so a worker started now must emit events
    // again instead of aborting at its first progress hook.
    assert_ok!(manager.start(request(URL_B, &dir)));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The channel may still hold pre-stop progress and the Cancelled
    // acknowledgment for URL_A; only the fresh worker's events matter here.
    let mut progress_seen = 0;
    manager.drain(
        |id, _| {
            if id == URL_B {
                progress_seen += 1;
            }
        },
        |_, _| {},
        |_, _| {},
        |_| {},
    );
    assert!(
        progress_seen > 0,
        "events from a worker started after stop_all must not be suppressed"
    );

    manager.stop_all().await;
}

// --- drain ---

#[tokio::test]
async fn drain_dispatches_in_emission_order_then_complete() {
    let (manager, dir) = manager_with(MockBehavior::Succeed { frames: 3 });

    assert_ok!(manager.start(request(URL_A, &dir)));
    wait_until_inactive(&manager, URL_A).await;

    let mut percents = Vec::new();
    let mut completed = Vec::new();
    let dispatched = manager.drain(
        |id, progress| {
            assert_eq!(id, URL_A);
            percents.push(progress.percent);
        },
        |id, result| {
            assert_eq!(id, URL_A);
            completed.push(result);
        },
        |_, error| panic!("unexpected error event: {error}"),
        |id| panic!("unexpected cancelled event for {id}"),
    );

    assert_eq!(dispatched, 4);
    assert_eq!(percents, vec![10.0, 20.0, 30.0], "per-task emission order");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].filename, "clip.mp4");
    assert_eq!(completed[0].title, "clip");
}

#[tokio::test]
async fn second_drain_with_no_new_events_dispatches_nothing() {
    let (manager, dir) = manager_with(MockBehavior::Succeed { frames: 2 });

    assert_ok!(manager.start(request(URL_A, &dir)));
    wait_until_inactive(&manager, URL_A).await;

    let first = manager.drain(|_, _| {}, |_, _| {}, |_, _| {}, |_| {});
    assert!(first > 0);

    let second = manager.drain(
        |_, _| panic!("no progress expected"),
        |_, _| panic!("no completion expected"),
        |_, _| panic!("no error expected"),
        |_| panic!("no cancellation expected"),
    );
    assert_eq!(second, 0);
}

// --- failure routing ---

#[tokio::test]
async fn worker_failure_surfaces_as_an_error_event() {
    let (manager, dir) = manager_with(MockBehavior::Fail {
        message: "boom".to_string(),
    });

    assert_ok!(manager.start(request(URL_A, &dir)));
    wait_until_inactive(&manager, URL_A).await;

    let mut errors = Vec::new();
    manager.drain(
        |_, _| {},
        |_, _| panic!("unexpected completion"),
        |id, error| errors.push((id.to_string(), error)),
        |id| panic!("unexpected cancelled event for {id}"),
    );

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, URL_A);
    assert!(
        errors[0].1.contains("boom"),
        "error message must be surfaced to the consumer, got: {}",
        errors[0].1
    );
    assert_eq!(manager.active_count(), 0, "failed workers also self-remove");
}

#[tokio::test]
async fn invalid_url_surfaces_as_an_error_event() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new("clip", MockBehavior::Succeed { frames: 1 }));
    let manager = DownloadManager::new(fetcher);

    let bad = "https://example.com/watch?v=dQw4w9WgXcQ";
    assert_ok!(manager.start(request(bad, &dir)));
    wait_until_inactive(&manager, bad).await;

    let mut errors = Vec::new();
    manager.drain(|_, _| {}, |_, _| {}, |id, e| errors.push((id.to_string(), e)), |_| {});

    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.contains("invalid URL"));
}
