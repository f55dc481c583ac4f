//! Item handler trait
//!
//! The queue's worker calls `handle` once per dequeued item. Closures of shape
//! `Fn(T)` are handlers through the blanket impl; anything that needs to await
//! implements the trait directly.

use anyhow::Result;
use async_trait::async_trait;

/// Consumer side of a [`CancellableQueue`](crate::CancellableQueue).
///
/// Invocations never overlap within one queue: the worker awaits each call
/// before dequeuing the next item. An `Err` (or a panic) ends only that
/// dispatch; the worker logs it and moves on.
#[async_trait]
pub trait ItemHandler<T: Send + 'static>: Send + Sync + 'static {
    async fn handle(&self, item: T) -> Result<()>;
}

#[async_trait]
impl<T, F> ItemHandler<T> for F
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    async fn handle(&self, item: T) -> Result<()> {
        self(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn closure_is_a_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |item: u32| sink.lock().unwrap().push(item);

        handler.handle(1).await.unwrap();
        handler.handle(2).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
