//! Dispatcher behaviour against the deterministic mock engine.

use std::time::{Duration, Instant};

use argonbox_core::{ArgonError, HashOptions};
use argonbox_engine::HashOrchestrator;
use argonbox_engine::testing::{HANG_TIME_COST, MockEngine, SLOW_TIME_COST, TRAP_TIME_COST};
use argonbox_worker::{ArgonWorker, WorkerConfig, WorkerError};
use futures::future::join_all;

async fn worker() -> ArgonWorker {
    let worker = ArgonWorker::spawn(MockEngine::versioned().image(), WorkerConfig::default()).unwrap();
    worker.ready().await.unwrap();
    worker
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_match_sync_results() {
    let image = MockEngine::versioned().image();
    let sync = HashOrchestrator::new(image.clone());
    let worker = ArgonWorker::spawn(image, WorkerConfig::default()).unwrap();
    worker.ready().await.unwrap();

    let passwords: Vec<Vec<u8>> = (0u8..8).map(|i| vec![b'p', i, i]).collect();
    let options = HashOptions::new();
    let futures: Vec<_> = passwords
        .iter()
        .map(|pw| worker.hash(pw, b"somesalt", &options))
        .collect();
    assert_eq!(worker.issued_requests(), 8);

    let results = join_all(futures).await;
    for (pw, result) in passwords.iter().zip(results) {
        let expected = sync.hash(pw, b"somesalt", &options).unwrap();
        assert_eq!(result.unwrap(), expected);
    }
    assert_eq!(worker.pending_requests(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn responses_are_correlated_by_id() {
    let worker = worker().await;
    let slow = worker.hash(
        b"slow",
        b"somesalt",
        &HashOptions::new().with_time_cost(SLOW_TIME_COST),
    );
    let fast = worker.keyed_hash(b"fast", 16);
    let check = worker.verify(b"slow", b"somesalt", &[0; 32], &HashOptions::new());

    // Await in reverse order of submission.
    assert!(!check.await.unwrap());
    assert_eq!(fast.await.unwrap().len(), 16);
    assert_eq!(slow.await.unwrap().len(), 32);
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_are_forwarded_and_worker_survives() {
    let worker = worker().await;

    let err = worker
        .hash(b"pw", b"somesalt", &HashOptions::new().with_time_cost(0))
        .await
        .unwrap_err();
    assert_eq!(err.as_hash_error(), Some(&ArgonError::InvalidParameter("t")));

    let err = worker
        .hash(b"pw", b"somesalt", &HashOptions::new().with_time_cost(TRAP_TIME_COST))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Hash(ArgonError::Trap(_))), "{err:?}");

    let err = worker.keyed_hash(b"msg", 65).await.unwrap_err();
    assert_eq!(err.as_hash_error(), Some(&ArgonError::InvalidParameter("length")));

    let digest = worker.hash(b"pw", b"somesalt", &HashOptions::new()).await.unwrap();
    assert!(worker
        .verify(b"pw", b"somesalt", digest.as_bytes(), &HashOptions::new())
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_defaults_apply() {
    let config = WorkerConfig::default().with_defaults(HashOptions::new().with_length(64));
    let worker = ArgonWorker::spawn(MockEngine::versioned().image(), config).unwrap();
    worker.ready().await.unwrap();
    let digest = worker.hash(b"pw", b"somesalt", &HashOptions::new()).await.unwrap();
    assert_eq!(digest.len(), 64);
}

/// Poll until the worker's context thread has exited.
async fn wait_for_context_exit(worker: &ArgonWorker) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !worker.context_exited() {
        assert!(Instant::now() < deadline, "context thread still running");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_interrupts_in_flight_work_and_leaves_it_unsettled() {
    let mut worker = worker().await;
    let hung = worker.hash(
        b"pw",
        b"somesalt",
        &HashOptions::new().with_time_cost(HANG_TIME_COST),
    );
    let queued = worker.keyed_hash(b"msg", 32);

    // The hung call never returns on its own.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!worker.context_exited());

    worker.terminate();
    assert!(worker.is_terminated());
    assert_eq!(worker.pending_requests(), 0);
    wait_for_context_exit(&worker).await;

    assert!(tokio::time::timeout(Duration::from_millis(300), hung).await.is_err());
    assert!(tokio::time::timeout(Duration::from_millis(300), queued).await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_stops_an_idle_context() {
    let mut worker = worker().await;
    assert!(!worker.context_exited());
    worker.terminate();
    wait_for_context_exit(&worker).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_worker_leaves_futures_unsettled() {
    let worker = worker().await;
    let slow = worker.hash(
        b"pw",
        b"somesalt",
        &HashOptions::new().with_time_cost(SLOW_TIME_COST),
    );
    drop(worker);
    assert!(tokio::time::timeout(Duration::from_millis(300), slow).await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn calls_after_terminate_fail_fast() {
    let mut worker = worker().await;
    worker.terminate();
    worker.terminate();

    let err = worker.hash(b"pw", b"somesalt", &HashOptions::new()).await.unwrap_err();
    assert!(matches!(err, WorkerError::Terminated));
    let err = worker.keyed_hash(b"msg", 32).await.unwrap_err();
    assert!(matches!(err, WorkerError::Terminated));
    assert_eq!(worker.issued_requests(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn request_ids_start_at_zero_and_increase() {
    let worker = worker().await;
    assert_eq!(worker.issued_requests(), 0);
    let a = worker.keyed_hash(b"a", 32);
    let b = worker.keyed_hash(b"b", 32);
    assert_eq!(worker.issued_requests(), 2);
    assert_ne!(a.await.unwrap(), b.await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_thread_is_named() {
    let config = WorkerConfig::default().with_thread_name("argon-test");
    let worker = ArgonWorker::spawn(MockEngine::versioned().image(), config).unwrap();
    worker.ready().await.unwrap();
    assert_eq!(worker.name(), "argon-test");
}
