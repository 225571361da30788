//! Worker events through a subscriber built from the `[logging]` section.
//!
//! Installs a global subscriber, so this file holds a single test.

use std::io::Write;
use std::sync::{Arc, Mutex};

use argonbox_config::Config;
use argonbox_core::HashOptions;
use argonbox_engine::testing::MockEngine;
use argonbox_telemetry::LogConfig;
use argonbox_worker::WorkerPool;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_events_carry_thread_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.wat");
    std::fs::write(&path, MockEngine::versioned().wat()).unwrap();
    let toml = format!(
        "[engine]\npath = {path:?}\n\n[worker]\npool_size = 2\nthread_name = \"hasher\"\n\n\
         [logging]\nlevel = \"warn\"\nformat = \"json\"\ndirectives = [\"argonbox_worker=debug\"]\n",
        path = path.display().to_string()
    );
    let config = Config::from_toml_str(&toml).unwrap();

    let out = Captured::default();
    let writer = out.clone();
    let log_config = LogConfig::try_from(&config.logging).unwrap();
    let subscriber = argonbox_telemetry::subscriber(&log_config, move || writer.clone()).unwrap();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let mut pool = WorkerPool::from_config(&config).unwrap();
    pool.ready().await.unwrap();
    pool.hash(b"pw", b"somesalt", &HashOptions::new()).await.unwrap();
    pool.terminate();

    let bytes = out.0.lock().unwrap().clone();
    let events: Vec<serde_json::Value> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let thread_of = |message: &str| -> Vec<String> {
        events
            .iter()
            .filter(|e| e["fields"]["message"] == message)
            .filter_map(|e| e["threadName"].as_str().map(str::to_owned))
            .collect()
    };
    let mut ready = thread_of("worker context ready");
    ready.sort();
    assert_eq!(ready, ["hasher-0", "hasher-1"]);
    assert_eq!(thread_of("worker terminated").len(), 2);

    // Engine events stay below the global `warn` level.
    assert!(events
        .iter()
        .all(|e| !e["target"].as_str().unwrap_or("").starts_with("argonbox_engine")
            || e["level"] == "WARN"));
}
