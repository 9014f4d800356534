//! Bounded worker pool for asynchronous dictionary mutation.
//!
//! Jobs go through a bounded `crossbeam-channel` queue. When the queue is
//! full, or the pool has been shut down, the submitting thread runs the job
//! itself, so submissions are never dropped. Each job's outcome comes back
//! through a [`MutationHandle`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, error, warn};

use crate::error::{AutomatonError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct MutationPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MutationPool {
    /// Spawn `workers` threads (at least one) behind a queue of
    /// `queue_capacity` pending jobs.
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = bounded::<Job>(queue_capacity);
        let handles = (0..workers.max(1))
            .filter_map(|i| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("sw-mutation-{i}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .map_err(|e| error!("Failed to spawn mutation worker: {e}"))
                    .ok()
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Queue `f`, or run it on the calling thread when the queue is full or
    /// the pool is shut down.
    pub fn submit<T, F>(&self, f: F) -> MutationHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
                Err(AutomatonError::MutationFailed("mutation panicked".to_string()))
            });
            let _ = result_tx.send(outcome);
        });

        let rejected = {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            match sender.as_ref() {
                Some(tx) => match tx.try_send(job) {
                    Ok(()) => None,
                    Err(TrySendError::Full(job)) => {
                        warn!("Mutation queue full, running on caller thread");
                        Some(job)
                    }
                    Err(TrySendError::Disconnected(job)) => Some(job),
                },
                None => {
                    warn!("Mutation pool shut down, running on caller thread");
                    Some(job)
                }
            }
        };
        if let Some(job) = rejected {
            job();
        }

        MutationHandle { receiver: result_rx }
    }

    /// Close the queue, let workers drain what was accepted, and join them.
    /// Calling it again is a no-op.
    pub fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        if workers.is_empty() {
            return;
        }
        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!("Mutation worker panicked");
            }
        }
        debug!("Mutation pool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl Drop for MutationPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MutationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationPool")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Outcome of an asynchronous mutation.
#[derive(Debug)]
pub struct MutationHandle<T> {
    receiver: Receiver<Result<T>>,
}

impl<T> MutationHandle<T> {
    /// Block until the mutation finishes.
    pub fn wait(self) -> Result<T> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(AutomatonError::MutationFailed("result channel closed".to_string()))
        })
    }

    /// The outcome if the mutation already finished.
    pub fn try_wait(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AutomatonError::MutationFailed(
                "result channel closed".to_string(),
            ))),
        }
    }

    /// True once the outcome is ready and not yet taken.
    pub fn is_done(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_submit_returns_outcome() {
        let pool = MutationPool::new(2, 8);
        let handle = pool.submit(|| Ok(42));
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn test_errors_pass_through() {
        let pool = MutationPool::new(1, 8);
        let handle = pool.submit(|| Err::<(), _>(AutomatonError::ReadOnly));
        assert!(matches!(handle.wait(), Err(AutomatonError::ReadOnly)));
    }

    #[test]
    fn test_panic_becomes_error() {
        let pool = MutationPool::new(1, 8);
        let handle = pool.submit(|| -> Result<()> { panic!("boom") });
        assert!(matches!(handle.wait(), Err(AutomatonError::MutationFailed(_))));
        // The worker survives
        assert_eq!(pool.submit(|| Ok(1)).wait().unwrap(), 1);
    }

    #[test]
    fn test_full_queue_runs_on_caller() {
        let pool = MutationPool::new(1, 1);
        let (started_tx, started_rx) = bounded::<()>(1);
        let (gate_tx, gate_rx) = bounded::<()>(1);

        let blocker = pool.submit(move || {
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
            Ok(thread::current().id())
        });
        started_rx.recv().unwrap();

        let queued = pool.submit(|| Ok(thread::current().id()));
        let overflow = pool.submit(|| Ok(thread::current().id()));
        assert!(overflow.is_done());
        assert_eq!(overflow.wait().unwrap(), thread::current().id());

        gate_tx.send(()).unwrap();
        assert_ne!(blocker.wait().unwrap(), thread::current().id());
        assert_ne!(queued.wait().unwrap(), thread::current().id());
    }

    #[test]
    fn test_shutdown_drains_and_is_idempotent() {
        let pool = MutationPool::new(2, 64);
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let counter = counter.clone();
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_shut_down());
        assert_eq!(counter.load(Ordering::SeqCst), 32);
        for handle in handles {
            assert!(handle.wait().is_ok());
        }
    }

    #[test]
    fn test_submit_after_shutdown_runs_on_caller() {
        let pool = MutationPool::new(1, 4);
        pool.shutdown();
        let handle = pool.submit(|| Ok(thread::current().id()));
        assert_eq!(handle.wait().unwrap(), thread::current().id());
    }
}
