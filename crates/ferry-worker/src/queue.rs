//! Cancellable queue: bounded buffer, single worker, start/stop lifecycle.
//!
//! Shutdown: [`CancellableQueue::stop`] cancels the current run and returns
//! immediately. It does not wait for an in-flight handler call. The worker
//! drops the items still buffered as soon as it sees the cancellation, lets
//! the in-flight call finish, and exits without dispatching anything else.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use ferry_core::{PushError, QueueConfig, QueueError};

use crate::handler::ItemHandler;
use crate::stats::{Counters, QueueStats};

const DEFAULT_QUEUE_NAME: &str = "ferry";

/// State owned by one `start`..`stop` cycle.
struct Run<T> {
    id: Uuid,
    sender: mpsc::Sender<T>,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

impl<T> Run<T> {
    /// False once the worker has gone away without a stop, e.g. because its
    /// runtime shut down.
    fn is_live(&self) -> bool {
        !self.sender.is_closed()
    }

    fn buffered(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

/// Bounded multi-producer queue drained by one background worker.
///
/// All methods take `&self`; share the queue between producers with an `Arc`.
/// Dropping the queue stops the current run.
pub struct CancellableQueue<T> {
    name: Arc<str>,
    run: Mutex<Option<Run<T>>>,
    counters: Arc<Counters>,
}

impl<T> Default for CancellableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CancellableQueue<T> {
    /// Create an idle queue. Nothing is allocated or spawned until `start`.
    pub fn new() -> Self {
        Self::with_name(DEFAULT_QUEUE_NAME)
    }

    /// Create an idle queue whose log records carry `name`.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            run: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Nothing the lock guards can be left half-updated, so a poisoned lock is
    // still usable.
    fn lock(&self) -> MutexGuard<'_, Option<Run<T>>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue `item` without waiting.
    ///
    /// Returns `false` if the queue is not running or its buffer is full; use
    /// [`try_push`](Self::try_push) to tell the two apart.
    pub fn push(&self, item: T) -> bool {
        self.try_push(item).is_ok()
    }

    /// Enqueue `item` without waiting, handing it back on rejection.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let slot = self.lock();
        let Some(run) = slot.as_ref() else {
            self.counters.rejected_idle();
            tracing::trace!(queue = %self.name, "Push rejected, queue not running");
            return Err(PushError::NotRunning(item));
        };

        match run.sender.try_send(item) {
            Ok(()) => {
                self.counters.accepted();
                Ok(())
            }
            Err(TrySendError::Full(item)) => {
                self.counters.rejected_full();
                tracing::trace!(
                    queue = %self.name,
                    run_id = %run.id,
                    capacity = run.sender.max_capacity(),
                    "Push rejected, queue full"
                );
                Err(PushError::Full(item))
            }
            Err(TrySendError::Closed(item)) => {
                // Worker is gone without a stop, e.g. its runtime shut down.
                self.counters.rejected_idle();
                tracing::debug!(
                    queue = %self.name,
                    run_id = %run.id,
                    "Push rejected, queue worker has exited"
                );
                Err(PushError::NotRunning(item))
            }
        }
    }

    /// Cancel the current run, if any, and release its buffer.
    ///
    /// Idempotent. Returns immediately without joining the worker. The worker
    /// drops the buffered items as soon as it observes the cancellation, even
    /// while a handler call is still in flight; that call finishes on its own
    /// and nothing else from this run is dispatched afterwards.
    pub fn stop(&self) {
        let mut slot = self.lock();
        if let Some(run) = slot.take() {
            self.cancel_run(run);
        }
    }

    fn cancel_run(&self, run: Run<T>) {
        run.cancel.cancel();
        tracing::info!(
            queue = %self.name,
            run_id = %run.id,
            abandoned = run.buffered(),
            "Queue stopped"
        );
        // Dropping `run` drops the last sender; the worker closes the receiver
        // and drops what is left once it sees the cancellation.
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(Run::is_live)
    }

    /// Items currently buffered in this run. Zero when idle.
    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, Run::buffered)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffer capacity of the current run.
    pub fn capacity(&self) -> Option<usize> {
        self.lock().as_ref().map(|run| run.sender.max_capacity())
    }

    /// Id of the current run, fresh on every `start`.
    pub fn run_id(&self) -> Option<Uuid> {
        self.lock().as_ref().map(|run| run.id)
    }

    pub fn stats(&self) -> QueueStats {
        let slot = self.lock();
        match slot.as_ref() {
            Some(run) => {
                self.counters
                    .snapshot(run.is_live(), Some(run.started_at), run.buffered())
            }
            None => self.counters.snapshot(false, None, 0),
        }
    }
}

impl<T: Send + 'static> CancellableQueue<T> {
    /// Start a run with a fresh buffer of `capacity` items and spawn its worker.
    ///
    /// A run already in progress is stopped first and its buffered items are
    /// discarded. Must be called from within a Tokio runtime. Returns without
    /// waiting for the worker to be scheduled.
    pub fn start<H>(&self, capacity: usize, handler: H) -> Result<(), QueueError>
    where
        H: ItemHandler<T>,
    {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let mut slot = self.lock();
        if let Some(previous) = slot.take() {
            self.cancel_run(previous);
        }

        let (sender, receiver) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        let id = Uuid::new_v4();

        let span = tracing::info_span!("queue_worker", queue = %self.name, run_id = %id);
        runtime.spawn(
            run_worker(
                receiver,
                Arc::new(handler),
                cancel.clone(),
                Arc::clone(&self.counters),
            )
            .instrument(span),
        );

        self.counters.run_started();
        tracing::info!(queue = %self.name, run_id = %id, capacity, "Queue started");

        *slot = Some(Run {
            id,
            sender,
            cancel,
            started_at: Utc::now(),
        });
        Ok(())
    }

    /// `start` with the capacity from `config`.
    pub fn start_with_config<H>(&self, config: &QueueConfig, handler: H) -> Result<(), QueueError>
    where
        H: ItemHandler<T>,
    {
        config.validate()?;
        self.start(config.capacity, handler)
    }
}

impl<T> Drop for CancellableQueue<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_worker<T, H>(
    mut receiver: mpsc::Receiver<T>,
    handler: Arc<H>,
    cancel: CancellationToken,
    counters: Arc<Counters>,
) where
    T: Send + 'static,
    H: ItemHandler<T>,
{
    tracing::debug!("Queue worker started");

    let mut abandoned = 0;
    loop {
        // Cancellation is polled first so nothing is dispatched once stop has run.
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let handler = Arc::clone(&handler);
        let mut dispatch =
            tokio::spawn(async move { handler.handle(item).await }.in_current_span());

        let outcome = tokio::select! {
            biased;
            outcome = &mut dispatch => outcome,
            _ = cancel.cancelled() => {
                // Stopped mid-dispatch: free the buffer now, let the call finish.
                abandoned = release_buffer(&mut receiver);
                record_outcome(&counters, dispatch.await);
                break;
            }
        };
        record_outcome(&counters, outcome);
    }

    abandoned += release_buffer(&mut receiver);
    tracing::info!(abandoned, "Queue worker stopped");
}

/// Close the buffer and drop everything still in it. Returns how many items
/// were dropped.
fn release_buffer<T>(receiver: &mut mpsc::Receiver<T>) -> usize {
    receiver.close();
    let mut released = 0;
    while receiver.try_recv().is_ok() {
        released += 1;
    }
    released
}

fn record_outcome(counters: &Counters, outcome: Result<anyhow::Result<()>, JoinError>) {
    match outcome {
        Ok(Ok(())) => counters.completed(),
        Ok(Err(e)) => {
            counters.failed();
            tracing::warn!(error = %e, "Queue handler failed");
        }
        Err(e) if e.is_panic() => {
            counters.failed();
            tracing::error!(error = %e, "Queue handler panicked");
        }
        Err(e) => {
            counters.failed();
            tracing::error!(error = %e, "Queue handler task was cancelled");
        }
    }
}
