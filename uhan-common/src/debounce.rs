//! Debounce combinator
//!
//! Runs a handler once after a quiet period, coalescing bursts of triggers
//! into a single call with the most recent value. Each new trigger restarts
//! the timer; the timer is the only thing ever cancelled.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Handle to a running debounce task
///
/// Dropping the handle stops the task; a pending (not yet fired) value is
/// discarded.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
    delay: Duration,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce task on the current tokio runtime
    pub fn new<F, Fut>(delay: Duration, mut handler: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                if pending.is_none() {
                    match rx.recv().await {
                        Some(value) => pending = Some(value),
                        None => break,
                    }
                }

                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(value) => {
                            trace!("Debounce timer reset");
                            pending = Some(value);
                        }
                        None => break,
                    },
                    _ = tokio::time::sleep(delay) => {
                        if let Some(value) = pending.take() {
                            handler(value).await;
                        }
                    }
                }
            }
        });

        Self { tx, task, delay }
    }

    /// Schedule the handler with `value`, replacing any pending value
    pub fn trigger(&self, value: T) {
        // Send only fails once the task has ended, when nothing is listening
        let _ = self.tx.send(value);
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
