//! Ferry Worker Library
//!
//! A bounded work queue that hands items, one at a time, to a single
//! background worker and can be stopped and restarted.

pub mod handler;
pub mod queue;
pub mod stats;

pub use handler::ItemHandler;
pub use queue::CancellableQueue;
pub use stats::QueueStats;

pub use ferry_core::{PushError, QueueConfig, QueueError};
