//! Argonbox worker - hashing off the caller's execution context.
//!
//! [`ArgonWorker`] runs a [`HashOrchestrator`](argonbox_engine::HashOrchestrator)
//! on a dedicated OS thread and talks to it over tokio channels. Responses
//! are correlated to requests by id, so callers may await them in any order.
//! [`WorkerPool`] spreads requests over several workers.
//!
//! Workers log through `tracing` under their thread names. Install a
//! subscriber first, e.g. with `argonbox-telemetry`:
//!
//! ```rust,no_run
//! use argonbox_config::Config;
//! use argonbox_core::HashOptions;
//! use argonbox_worker::WorkerPool;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?.config;
//! argonbox_telemetry::init_from_config(&config)?;
//!
//! let pool = WorkerPool::from_config(&config)?;
//! pool.ready().await?;
//! let digest = pool.hash(b"password", b"somesalt", &HashOptions::new()).await?;
//! # drop(digest);
//! # Ok(())
//! # }
//! ```
//!
//! A single worker:
//!
//! ```rust,no_run
//! use argonbox_core::HashOptions;
//! use argonbox_engine::EngineLoader;
//! use argonbox_worker::{ArgonWorker, WorkerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let image = EngineLoader::new().load_file("engine.wasm".as_ref())?;
//! let worker = ArgonWorker::spawn(image, WorkerConfig::default())?;
//! worker.ready().await?;
//!
//! let digest = worker.hash(b"password", b"somesalt", &HashOptions::new()).await?;
//! let ok = worker
//!     .verify(b"password", b"somesalt", digest.as_bytes(), &HashOptions::new())
//!     .await?;
//! assert!(ok);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![warn(unreachable_pub)]

mod config;
mod context;
mod dispatcher;
mod error;
mod pool;
mod protocol;

pub use config::{DEFAULT_THREAD_NAME, WorkerConfig};
pub use dispatcher::ArgonWorker;
pub use error::{WorkerError, WorkerResult};
pub use pool::{MAX_POOL_SIZE, WorkerPool};
pub use protocol::OperationKind;
