//! Worker pool dispatch.

use argonbox_config::Config;
use argonbox_core::HashOptions;
use argonbox_engine::HashOrchestrator;
use argonbox_engine::testing::MockEngine;
use argonbox_worker::{WorkerConfig, WorkerError, WorkerPool};
use futures::future::try_join_all;

#[tokio::test(flavor = "multi_thread")]
async fn pool_results_match_sync_results() {
    let image = MockEngine::versioned().image();
    let sync = HashOrchestrator::new(image.clone());
    let pool = WorkerPool::spawn(&image, 3, &WorkerConfig::default()).unwrap();
    pool.ready().await.unwrap();
    assert_eq!(pool.size(), 3);

    let salts: Vec<Vec<u8>> = (0u8..9).map(|i| vec![b's'; 8 + usize::from(i)]).collect();
    let options = HashOptions::new();
    let results = try_join_all(salts.iter().map(|salt| pool.hash(b"pw", salt, &options)))
        .await
        .unwrap();
    for (salt, digest) in salts.iter().zip(results) {
        assert_eq!(digest, sync.hash(b"pw", salt, &options).unwrap());
    }

    // Round-robin: every worker got three requests.
    for worker in pool.workers() {
        assert_eq!(worker.issued_requests(), 3);
    }
    assert_eq!(pool.pending_requests(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_threads_get_indexed_names() {
    let config = WorkerConfig::default().with_thread_name("hasher");
    let pool = WorkerPool::spawn(&MockEngine::versioned().image(), 2, &config).unwrap();
    let names: Vec<_> = pool.workers().iter().map(|w| w.name().to_owned()).collect();
    assert_eq!(names, ["hasher-0", "hasher-1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_verify_and_keyed_hash() {
    let pool = WorkerPool::spawn(&MockEngine::versioned().image(), 2, &WorkerConfig::default())
        .unwrap();
    pool.ready().await.unwrap();
    let digest = pool.hash(b"pw", b"somesalt", &HashOptions::new()).await.unwrap();
    assert!(pool
        .verify(b"pw", b"somesalt", digest.as_bytes(), &HashOptions::new())
        .await
        .unwrap());
    assert_eq!(pool.keyed_hash(b"msg", 64).await.unwrap().len(), 64);
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_size_is_validated() {
    let image = MockEngine::versioned().image();
    assert!(matches!(
        WorkerPool::spawn(&image, 0, &WorkerConfig::default()),
        Err(WorkerError::Config(_))
    ));
    assert!(matches!(
        WorkerPool::spawn(&image, 257, &WorkerConfig::default()),
        Err(WorkerError::Config(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn terminated_pool_rejects_requests() {
    let mut pool = WorkerPool::spawn(&MockEngine::versioned().image(), 2, &WorkerConfig::default())
        .unwrap();
    pool.terminate();
    for _ in 0..2 {
        let err = pool.keyed_hash(b"msg", 32).await.unwrap_err();
        assert!(matches!(err, WorkerError::Terminated));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_from_config_loads_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.wat");
    std::fs::write(&path, MockEngine::versioned().wat()).unwrap();

    let toml = format!(
        "[engine]\npath = {path:?}\n\n[defaults]\nlength = 64\n\n[worker]\npool_size = 2\n",
        path = path.display().to_string()
    );
    let config = Config::from_toml_str(&toml).unwrap();
    let pool = WorkerPool::from_config(&config).unwrap();
    pool.ready().await.unwrap();
    assert_eq!(pool.size(), 2);
    let digest = pool.hash(b"pw", b"somesalt", &HashOptions::new()).await.unwrap();
    assert_eq!(digest.len(), 64);
}
