//! Ferry Core Library
//!
//! Configuration and error types shared by the queue worker and the CLI.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::QueueConfig;
pub use error::{PushError, QueueError};
