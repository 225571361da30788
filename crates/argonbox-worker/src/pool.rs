//! A fixed set of workers with round-robin dispatch.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use argonbox_config::Config;
use argonbox_core::{Digest, HashOptions};
use argonbox_engine::EngineImage;
use tracing::info;

use crate::config::WorkerConfig;
use crate::dispatcher::ArgonWorker;
use crate::error::{WorkerError, WorkerResult};

/// Largest pool [`WorkerPool::spawn`] accepts.
pub const MAX_POOL_SIZE: usize = 256;

/// `size` independent [`ArgonWorker`]s over the same engine image.
///
/// Each worker has its own isolated context, so up to `size` requests run in
/// parallel. Requests are assigned round-robin; one slow request delays
/// only the requests queued behind it on the same worker.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<ArgonWorker>,
    next: AtomicUsize,
}

impl WorkerPool {
    /// Spawn `size` workers. Thread names get a `-{index}` suffix.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Config`] unless `1 <= size <= 256`, plus everything
    /// [`ArgonWorker::spawn`] returns.
    pub fn spawn(image: &EngineImage, size: usize, config: &WorkerConfig) -> WorkerResult<Self> {
        if !(1..=MAX_POOL_SIZE).contains(&size) {
            return Err(WorkerError::Config(format!(
                "pool size must be between 1 and {MAX_POOL_SIZE}, got {size}"
            )));
        }
        let workers = (0..size)
            .map(|index| {
                let config = config
                    .clone()
                    .with_thread_name(format!("{}-{index}", config.thread_name));
                ArgonWorker::spawn(image.clone(), config)
            })
            .collect::<WorkerResult<Vec<_>>>()?;
        info!(size, "worker pool spawned");
        Ok(Self {
            workers,
            next: AtomicUsize::new(0),
        })
    }

    /// Pool described by `config`: engine image, `[defaults]` and `[worker]`.
    ///
    /// # Errors
    ///
    /// Everything [`WorkerConfig::load`] and [`spawn`](Self::spawn) return.
    pub fn from_config(config: &Config) -> WorkerResult<Self> {
        let (image, worker) = WorkerConfig::load(config)?;
        Self::spawn(&image, config.worker.pool_size, &worker)
    }

    /// Number of workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// The workers, in dispatch order.
    #[must_use]
    pub fn workers(&self) -> &[ArgonWorker] {
        &self.workers
    }

    /// Resolves once every worker is ready.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Terminated`] if any worker exits first.
    pub async fn ready(&self) -> WorkerResult<()> {
        for worker in &self.workers {
            worker.ready().await?;
        }
        Ok(())
    }

    /// Requests posted to any worker and not yet settled.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.workers.iter().map(ArgonWorker::pending_requests).sum()
    }

    /// See [`ArgonWorker::hash`].
    pub fn hash(
        &self,
        password: &[u8],
        salt: &[u8],
        options: &HashOptions,
    ) -> impl Future<Output = WorkerResult<Digest>> + Send + 'static {
        self.pick().hash(password, salt, options)
    }

    /// See [`ArgonWorker::verify`].
    pub fn verify(
        &self,
        password: &[u8],
        salt: &[u8],
        expected: &[u8],
        options: &HashOptions,
    ) -> impl Future<Output = WorkerResult<bool>> + Send + 'static {
        self.pick().verify(password, salt, expected, options)
    }

    /// See [`ArgonWorker::keyed_hash`].
    pub fn keyed_hash(
        &self,
        message: &[u8],
        length: usize,
    ) -> impl Future<Output = WorkerResult<Digest>> + Send + 'static {
        self.pick().keyed_hash(message, length)
    }

    /// Terminate every worker. See [`ArgonWorker::terminate`].
    pub fn terminate(&mut self) {
        for worker in &mut self.workers {
            worker.terminate();
        }
    }

    fn pick(&self) -> &ArgonWorker {
        let turn = self.next.fetch_add(1, Ordering::Relaxed);
        let index = turn.checked_rem(self.workers.len()).unwrap_or(0);
        &self.workers[index]
    }
}
