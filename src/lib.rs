//! Multi-producer task execution pool
//!
//! A fixed set of parked worker threads drains a dynamic set of *task
//! providers* (user-facing queues and streams) under a fair, wake-on-demand
//! scheduling policy with cooperative cancellation and deterministic
//! shutdown.
//!
//! | Area            | Description                                                      | Key types                               |
//! |-----------------|------------------------------------------------------------------|-----------------------------------------|
//! | **Pool**        | Fixed worker set shared by any number of queues and streams.     | [`ExecutionPool`], [`PoolConfig`]       |
//! | **Queues**      | FIFO submission, serial or concurrent execution, result handles. | [`ExecutionQueue`], [`TaskHandle`]      |
//! | **Streams**     | Demand-driven producers that run whenever a worker is free.      | [`ExecutionStream`]                     |
//! | **Cancellation**| Shared flags honored cooperatively by user callbacks.            | [`CancelToken`]                         |
//! | **Errors**      | Synchronous configuration errors, per-task failures.             | [`PoolError`], [`TaskError`]            |
//!
//! # Example
//!
//! ```
//! use execpool::ExecutionPool;
//!
//! let pool = ExecutionPool::new();
//! let queue = pool.concurrent_queue(|_cancel, n: u64| n * n);
//!
//! let handle = queue.push(7);
//! assert_eq!(handle.wait(), Ok(49));
//! ```
//!
//! # Long-running work
//!
//! Pool workers are a shared resource: a callback that blocks for a long time
//! occupies a worker for its whole duration and degrades throughput for every
//! queue and stream attached to the pool. For long-term jobs, use a
//! pool-independent serial queue ([`ExecutionQueue::standalone_serial`]),
//! which runs on its own dedicated thread.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod cancel;
mod config;
mod error;
mod handle;
mod pool;
mod provider;
mod queue;
mod stream;
mod task;
mod worker;

pub use cancel::CancelToken;
pub use config::PoolConfig;
pub use error::{PoolError, TaskError};
pub use handle::TaskHandle;
pub use pool::ExecutionPool;
pub use queue::ExecutionQueue;
pub use stream::ExecutionStream;
