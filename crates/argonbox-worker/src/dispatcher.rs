//! Async dispatcher over one isolated context.
//!
//! ```text
//! caller ── hash()/verify() ──► register PendingRequest{id} ──► request channel
//!                                                                    │
//!                                                      isolated context (thread)
//!                                                                    │
//! caller ◄── oneshot ◄── pump: remove PendingRequest{id} ◄── response channel
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use argonbox_core::{ArgonResult, Digest, HashOptions};
use argonbox_engine::{CancelToken, EngineImage, HashOrchestrator};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::WorkerConfig;
use crate::context::IsolatedContext;
use crate::error::{WorkerError, WorkerResult};
use crate::protocol::{Operation, OperationKind, Outcome, WorkerMessage, WorkerRequest};

/// A request waiting for its response.
struct PendingRequest {
    kind: OperationKind,
    tx: oneshot::Sender<ArgonResult<Outcome>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
    pending
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Runs `hash`, `verify` and `keyed_hash` on a dedicated thread.
///
/// Requests are processed one at a time in the order they were posted; use
/// a [`WorkerPool`](crate::WorkerPool) for parallel hashing. Every call
/// returns a future immediately and settles it when the matching response
/// arrives.
///
/// # Termination
///
/// [`terminate`](Self::terminate) (also run on drop) interrupts the
/// computation in progress and lets the context thread exit. Futures still
/// pending at that point never settle; race them against a timer if that
/// matters to the caller.
pub struct ArgonWorker {
    name: String,
    next_id: AtomicU64,
    pending: PendingMap,
    requests: Option<mpsc::UnboundedSender<WorkerRequest>>,
    ready: watch::Receiver<bool>,
    shutdown: Arc<AtomicBool>,
    cancel: CancelToken,
    pump: JoinHandle<()>,
    context: std::thread::JoinHandle<()>,
}

impl ArgonWorker {
    /// Start the isolated context for `image`.
    ///
    /// # Errors
    ///
    /// [`WorkerError::NoRuntime`] outside a tokio runtime,
    /// [`WorkerError::Spawn`] if the thread cannot be started.
    pub fn spawn(image: EngineImage, config: WorkerConfig) -> WorkerResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WorkerError::NoRuntime)?;

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(false);
        let shutdown = Arc::new(AtomicBool::new(false));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let cancel = image.cancel_token();

        let WorkerConfig {
            thread_name,
            stack_size,
            defaults,
        } = config;
        let context = IsolatedContext {
            name: thread_name.clone(),
            orchestrator: HashOrchestrator::new(image)
                .with_defaults(defaults)
                .with_cancel_token(cancel.clone()),
            requests: request_rx,
            responses: response_tx,
            shutdown: Arc::clone(&shutdown),
        };

        let mut builder = std::thread::Builder::new().name(thread_name.clone());
        if let Some(size) = stack_size {
            builder = builder.stack_size(size);
        }
        let context = builder
            .spawn(move || context.run())
            .map_err(WorkerError::Spawn)?;

        let pump = runtime.spawn(pump(
            thread_name.clone(),
            response_rx,
            Arc::clone(&pending),
            ready_tx,
        ));

        info!(worker = %thread_name, "worker spawned");
        Ok(Self {
            name: thread_name,
            next_id: AtomicU64::new(0),
            pending,
            requests: Some(request_tx),
            ready: ready_rx,
            shutdown,
            cancel,
            pump,
            context,
        })
    }

    /// Name of the isolated context's thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves once the isolated context has initialized.
    ///
    /// # Errors
    ///
    /// [`WorkerError::Terminated`] if the context exits first.
    pub async fn ready(&self) -> WorkerResult<()> {
        let mut ready = self.ready.clone();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| WorkerError::Terminated)
    }

    /// Number of requests posted but not yet settled.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Number of request ids handed out so far. Ids start at 0.
    #[must_use]
    pub fn issued_requests(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Whether the isolated context's thread has exited.
    #[must_use]
    pub fn context_exited(&self) -> bool {
        self.context.is_finished()
    }

    /// Whether [`terminate`](Self::terminate) has run.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.requests.is_none()
    }

    /// Argon2 hash on the worker. See [`HashOrchestrator::hash`].
    ///
    /// The request is posted before this returns.
    pub fn hash(
        &self,
        password: &[u8],
        salt: &[u8],
        options: &HashOptions,
    ) -> impl Future<Output = WorkerResult<Digest>> + Send + 'static {
        let rx = self.submit(Operation::Hash {
            password: Zeroizing::new(password.to_vec()),
            salt: salt.to_vec(),
            options: options.clone(),
        });
        async move {
            match settle(rx?).await? {
                Outcome::Digest(digest) => Ok(digest),
                Outcome::Verified(_) => Err(unexpected(OperationKind::Hash)),
            }
        }
    }

    /// Argon2 verify on the worker. See [`HashOrchestrator::verify`].
    ///
    /// The request is posted before this returns.
    pub fn verify(
        &self,
        password: &[u8],
        salt: &[u8],
        expected: &[u8],
        options: &HashOptions,
    ) -> impl Future<Output = WorkerResult<bool>> + Send + 'static {
        let rx = self.submit(Operation::Verify {
            password: Zeroizing::new(password.to_vec()),
            salt: salt.to_vec(),
            expected: expected.to_vec(),
            options: options.clone(),
        });
        async move {
            match settle(rx?).await? {
                Outcome::Verified(matched) => Ok(matched),
                Outcome::Digest(_) => Err(unexpected(OperationKind::Verify)),
            }
        }
    }

    /// BLAKE2b on the worker. See [`HashOrchestrator::keyed_hash`].
    ///
    /// The request is posted before this returns.
    pub fn keyed_hash(
        &self,
        message: &[u8],
        length: usize,
    ) -> impl Future<Output = WorkerResult<Digest>> + Send + 'static {
        let rx = self.submit(Operation::KeyedHash {
            message: message.to_vec(),
            length,
        });
        async move {
            match settle(rx?).await? {
                Outcome::Digest(digest) => Ok(digest),
                Outcome::Verified(_) => Err(unexpected(OperationKind::KeyedHash)),
            }
        }
    }

    /// Tear down the isolated context.
    ///
    /// The computation in progress (if any) is interrupted, queued requests
    /// are dropped and the context thread exits. Pending futures stay
    /// pending. Later calls fail with [`WorkerError::Terminated`].
    /// Idempotent.
    pub fn terminate(&mut self) {
        if self.requests.take().is_none() {
            return;
        }
        self.pump.abort();
        self.shutdown.store(true, Ordering::Release);
        self.cancel.cancel();

        // Dropping the senders keeps a late response from settling anything.
        let abandoned = {
            let mut pending = lock(&self.pending);
            let abandoned = pending.len();
            pending.clear();
            abandoned
        };
        info!(worker = %self.name, abandoned, "worker terminated");
    }

    /// Register a pending request and post it.
    fn submit(&self, operation: Operation) -> WorkerResult<oneshot::Receiver<ArgonResult<Outcome>>> {
        let requests = self.requests.as_ref().ok_or(WorkerError::Terminated)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = operation.kind();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, PendingRequest { kind, tx });

        if requests.send(WorkerRequest { id, operation }).is_err() {
            lock(&self.pending).remove(&id);
            return Err(WorkerError::Terminated);
        }
        debug!(worker = %self.name, id, %kind, "request posted");
        Ok(rx)
    }
}

impl Drop for ArgonWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for ArgonWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgonWorker")
            .field("name", &self.name)
            .field("issued_requests", &self.issued_requests())
            .field("pending_requests", &self.pending_requests())
            .field("terminated", &self.is_terminated())
            .field("context_exited", &self.context_exited())
            .finish_non_exhaustive()
    }
}

/// Await a response. A dropped sender means the worker was terminated and
/// the request will never settle.
async fn settle(rx: oneshot::Receiver<ArgonResult<Outcome>>) -> WorkerResult<Outcome> {
    match rx.await {
        Ok(outcome) => outcome.map_err(WorkerError::from),
        Err(_) => std::future::pending().await,
    }
}

fn unexpected(kind: OperationKind) -> WorkerError {
    WorkerError::Protocol(format!("mismatched response for {kind} request"))
}

/// Response multiplexer: settles pending requests by id.
async fn pump(
    name: String,
    mut responses: mpsc::UnboundedReceiver<WorkerMessage>,
    pending: PendingMap,
    ready: watch::Sender<bool>,
) {
    while let Some(message) = responses.recv().await {
        match message {
            WorkerMessage::Ready => {
                ready.send_replace(true);
                info!(worker = %name, "worker ready");
            },
            WorkerMessage::Response { id, outcome } => {
                let entry = lock(&pending).remove(&id);
                match entry {
                    Some(PendingRequest { kind, tx }) => {
                        debug!(worker = %name, id, %kind, ok = outcome.is_ok(), "request settled");
                        // The caller may have dropped its future.
                        let _ = tx.send(outcome);
                    },
                    None => warn!(worker = %name, id, "response for unknown request"),
                }
            },
        }
    }
    debug!(worker = %name, "worker response channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use argonbox_engine::testing::MockEngine;

    #[test]
    fn spawn_requires_runtime() {
        let result = ArgonWorker::spawn(MockEngine::versioned().image(), WorkerConfig::default());
        assert!(matches!(result, Err(WorkerError::NoRuntime)));
    }

    #[tokio::test]
    async fn unknown_response_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, mut ready_rx) = watch::channel(false);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (known_tx, known_rx) = oneshot::channel();
        lock(&pending).insert(
            7,
            PendingRequest {
                kind: OperationKind::Hash,
                tx: known_tx,
            },
        );

        tx.send(WorkerMessage::Ready).unwrap();
        tx.send(WorkerMessage::Response {
            id: 3,
            outcome: Ok(Outcome::Verified(true)),
        })
        .unwrap();
        tx.send(WorkerMessage::Response {
            id: 7,
            outcome: Ok(Outcome::Verified(false)),
        })
        .unwrap();
        drop(tx);

        pump("test".into(), rx, Arc::clone(&pending), ready_tx).await;
        assert!(*ready_rx.borrow_and_update());
        assert_eq!(known_rx.await.unwrap(), Ok(Outcome::Verified(false)));
        assert!(lock(&pending).is_empty());
    }

    #[tokio::test]
    async fn settle_maps_errors() {
        let (tx, rx) = oneshot::channel();
        tx.send(Err(argonbox_core::ArgonError::InvalidParameter("m")))
            .unwrap();
        assert!(matches!(
            settle(rx).await,
            Err(WorkerError::Hash(argonbox_core::ArgonError::InvalidParameter("m")))
        ));
    }
}
