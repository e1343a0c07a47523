//! Concurrency primitives for the sync pipeline
//!
//! The pipeline uses two worker pools in strict sequence, each draining a
//! [`WorkQueue`]. Workers exit on their own when their queue stays empty for
//! the poll timeout; a pool is complete once [`run_workers`] has joined all
//! of its workers.

pub mod pool;
pub mod queue;

pub use pool::run_workers;
pub use queue::WorkQueue;
