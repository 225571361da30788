//! The isolated context: a dedicated OS thread that owns one orchestrator
//! and processes requests strictly one at a time.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use argonbox_core::{ArgonError, ArgonResult};
use argonbox_engine::HashOrchestrator;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{Operation, Outcome, WorkerMessage, WorkerRequest};

pub(crate) struct IsolatedContext {
    pub(crate) name: String,
    pub(crate) orchestrator: HashOrchestrator,
    pub(crate) requests: mpsc::UnboundedReceiver<WorkerRequest>,
    pub(crate) responses: mpsc::UnboundedSender<WorkerMessage>,
    pub(crate) shutdown: Arc<AtomicBool>,
}

impl IsolatedContext {
    /// Thread body. Returns when the request channel closes, the dispatcher
    /// stops listening, or shutdown is requested.
    pub(crate) fn run(mut self) {
        debug!(worker = %self.name, "worker context ready");
        if self.responses.send(WorkerMessage::Ready).is_err() {
            return;
        }

        while let Some(WorkerRequest { id, operation }) = self.requests.blocking_recv() {
            if self.shutdown.load(Ordering::Acquire) {
                debug!(worker = %self.name, id, "shutdown requested, dropping queued requests");
                break;
            }
            let kind = operation.kind();
            let outcome = execute(&self.orchestrator, operation);
            if let Err(err) = &outcome {
                debug!(worker = %self.name, id, %kind, error = %err, "request failed");
            }
            if self
                .responses
                .send(WorkerMessage::Response { id, outcome })
                .is_err()
            {
                break;
            }
        }
        info!(worker = %self.name, "worker context stopped");
    }
}

/// Run one operation, turning a panic into an error so the context keeps
/// serving later requests.
fn execute(orchestrator: &HashOrchestrator, operation: Operation) -> ArgonResult<Outcome> {
    catch_unwind(AssertUnwindSafe(|| operation.execute(orchestrator))).unwrap_or_else(|_| {
        warn!("orchestrator panicked while handling a request");
        Err(ArgonError::Trap("orchestrator panicked".into()))
    })
}
