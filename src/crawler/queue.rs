//! Concurrency- and rate-limited task queue
//!
//! This module handles:
//! - FIFO admission of submitted tasks
//! - A global concurrency cap via a semaphore
//! - A minimum interval between successive task starts
//! - Cooperative shutdown: stop admission, then drain in-flight work
//!
//! A single dispatcher task owns the admission order. For each job it first
//! takes a concurrency permit, then waits for the next interval tick, then
//! spawns the job holding the permit. Every job reports through its own
//! oneshot channel, so a failing or panicking job never affects its siblings.
//! Once the queue is closed the dispatcher starts nothing more; jobs still
//! waiting for admission resolve as [`QueueError::Closed`].

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Errors reported by the queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue no longer admits work
    #[error("Scraper is shut down")]
    Closed,

    /// The task ended without producing a result (it panicked or was aborted)
    #[error("Task was dropped before completing")]
    TaskDropped,

    #[error("Queue did not drain within {0:?}")]
    DrainTimeout(Duration),

    #[error("Queue dispatcher failed: {0}")]
    Dispatcher(String),
}

/// What the dispatcher does with a queued job
enum Admission {
    Start,
    Reject,
}

type Job = Box<dyn FnOnce(Admission) -> BoxFuture<'static, ()> + Send>;

/// Resolves to the output of a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Option<oneshot::Receiver<Result<T, QueueError>>>,
}

impl<T> TaskHandle<T> {
    fn rejected() -> Self {
        Self { receiver: None }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().receiver.as_mut() {
            None => Poll::Ready(Err(QueueError::Closed)),
            Some(receiver) => Pin::new(receiver).poll(cx).map(|result| match result {
                Ok(output) => output,
                Err(_) => Err(QueueError::TaskDropped),
            }),
        }
    }
}

/// A FIFO queue with a concurrency cap and a minimum start interval
///
/// Must be constructed inside a tokio runtime; the dispatcher is spawned
/// immediately.
pub struct RateLimitedQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    closed: CancellationToken,
    pending: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl RateLimitedQueue {
    /// Creates a queue and starts its dispatcher
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum simultaneously executing tasks (at least 1)
    /// * `min_interval` - Minimum spacing between successive task starts
    pub fn new(concurrency: usize, min_interval: Duration) -> Self {
        let concurrency = concurrency.max(1);
        let closed = CancellationToken::new();
        let pending = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (sender, receiver) = mpsc::unbounded_channel();

        let dispatcher = Dispatcher {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            min_interval,
            closed: closed.clone(),
            pending: pending.clone(),
            in_flight: in_flight.clone(),
        };

        Self {
            sender: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(tokio::spawn(dispatcher.run(receiver)))),
            closed,
            pending,
            in_flight,
        }
    }

    /// Enqueues a task and returns a handle resolving to its output
    ///
    /// After [`shutdown`](Self::shutdown) the handle resolves to
    /// [`QueueError::Closed`] and the task is never run.
    pub fn submit<T, F, Fut>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = match self.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(sender) = sender else {
            return TaskHandle::rejected();
        };

        let (result_tx, result_rx) = oneshot::channel();
        let job: Job = Box::new(move |admission: Admission| match admission {
            Admission::Start => async move {
                let output = task().await;
                // The caller may have stopped waiting
                let _ = result_tx.send(Ok(output));
            }
            .boxed(),
            Admission::Reject => {
                let _ = result_tx.send(Err(QueueError::Closed));
                futures::future::ready(()).boxed()
            }
        });

        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return TaskHandle::rejected();
        }

        tracing::debug!(pending = self.pending(), "Task admitted to queue");

        TaskHandle {
            receiver: Some(result_rx),
        }
    }

    /// Tasks submitted but not yet started
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Tasks currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether the queue has stopped admitting work
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Stops admission and waits for in-flight tasks to finish
    ///
    /// Queued tasks that have not started are never started; their handles
    /// resolve to [`QueueError::Closed`]. Calling this more than once is a
    /// no-op.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every started task finished
    /// * `Err(QueueError::DrainTimeout)` - The deadline passed first
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), QueueError> {
        self.closed.cancel();
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }

        let dispatcher = match self.dispatcher.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(dispatcher) = dispatcher else {
            return Ok(());
        };

        tracing::info!(
            pending = self.pending(),
            in_flight = self.in_flight(),
            "Draining queue"
        );

        match tokio::time::timeout(deadline, dispatcher).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(QueueError::Dispatcher(e.to_string())),
            Err(_) => Err(QueueError::DrainTimeout(deadline)),
        }
    }
}

/// Owns admission: pulls jobs in FIFO order and starts or rejects each one
struct Dispatcher {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    min_interval: Duration,
    closed: CancellationToken,
    pending: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl Dispatcher {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<Job>) {
        let mut last_start: Option<Instant> = None;

        while let Some(job) = receiver.recv().await {
            let admitted = self.admit(last_start).await;
            self.pending.fetch_sub(1, Ordering::SeqCst);

            let Some(permit) = admitted else {
                // Reported to the caller before the returned future is dropped
                drop(job(Admission::Reject));
                continue;
            };
            last_start = Some(Instant::now());

            let slot = RunningSlot::enter(self.in_flight.clone(), permit);
            let run = job(Admission::Start);
            tokio::spawn(async move {
                run.await;
                drop(slot);
            });
        }

        // Admission is closed; wait until every started job has returned its permit
        let permits = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        let _ = self.semaphore.acquire_many(permits).await;
    }

    /// Waits for a free slot and the next interval tick
    ///
    /// Returns `None` once the queue is closed, even mid-wait.
    async fn admit(&self, last_start: Option<Instant>) -> Option<OwnedSemaphorePermit> {
        if self.closed.is_cancelled() {
            return None;
        }

        let permit = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return None,
            permit = self.semaphore.clone().acquire_owned() => permit.ok()?,
        };

        if let Some(last) = last_start {
            if !self.min_interval.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.closed.cancelled() => return None,
                    _ = tokio::time::sleep_until(last + self.min_interval) => {}
                }
            }
        }

        Some(permit)
    }
}

/// A concurrency slot held by a started job; released on completion or panic
struct RunningSlot {
    in_flight: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl RunningSlot {
    fn enter(in_flight: Arc<AtomicUsize>, permit: OwnedSemaphorePermit) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            in_flight,
            _permit: permit,
        }
    }
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    async fn explode() -> u32 {
        panic!("task panicked")
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_concurrency() {
        let queue = RateLimitedQueue::new(3, Duration::ZERO);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let active = active.clone();
                let peak = peak.clone();
                queue.submit(move || async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_are_spaced_by_interval() {
        let queue = RateLimitedQueue::new(5, Duration::from_millis(500));
        let starts = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let starts = starts.clone();
                queue.submit(move || async move {
                    starts.lock().unwrap().push(Instant::now());
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 5);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_does_not_reset_interval() {
        let queue = RateLimitedQueue::new(1, Duration::from_millis(1000));
        let starts = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let starts = starts.clone();
                queue.submit(move || async move {
                    starts.lock().unwrap().push(Instant::now());
                    tokio::time::sleep(Duration::from_millis(1500)).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        // A slot frees after 1.5s, which is past the tick, so no extra wait
        let starts = starts.lock().unwrap();
        assert_eq!(starts[1] - starts[0], Duration::from_millis(1500));
        assert_eq!(starts[2] - starts[1], Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_in_fifo_order() {
        let queue = RateLimitedQueue::new(1, Duration::ZERO);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let order = order.clone();
                queue.submit(move || async move {
                    order.lock().unwrap().push(i);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated() {
        let queue = RateLimitedQueue::new(2, Duration::ZERO);

        let ok = queue.submit(|| async { Ok::<u32, String>(1) });
        let err = queue.submit(|| async { Err::<u32, String>("boom".to_string()) });
        let panicked = queue.submit(explode);
        let after = queue.submit(|| async { 7u32 });

        assert_eq!(ok.await.unwrap(), Ok(1));
        assert_eq!(err.await.unwrap(), Err("boom".to_string()));
        assert_eq!(panicked.await, Err(QueueError::TaskDropped));
        assert_eq!(after.await.unwrap(), 7);
    }

    /// Lets the dispatcher run until it is parked on its next wait
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_started_tasks_then_rejects() {
        let queue = RateLimitedQueue::new(2, Duration::ZERO);
        let completed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let completed = completed.clone();
                queue.submit(move || async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    completed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        settle().await;
        assert_eq!(queue.in_flight(), 2);

        queue.shutdown(Duration::from_secs(10)).await.unwrap();

        assert_eq!(completed.load(Ordering::SeqCst), 2);
        assert!(queue.is_closed());
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(queue.pending(), 0);
        for handle in handles {
            handle.await.unwrap();
        }

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let rejected = queue.submit(move || async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(rejected.await, Err(QueueError::Closed));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_tasks_never_start_after_shutdown() {
        let queue = RateLimitedQueue::new(1, Duration::ZERO);
        let started = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let started = started.clone();
                queue.submit(move || async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                })
            })
            .collect();
        settle().await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        let result = queue.shutdown(Duration::from_secs(5)).await;
        assert_eq!(result, Err(QueueError::DrainTimeout(Duration::from_secs(5))));

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(), 0);

        let mut handles = handles.into_iter();
        assert_eq!(handles.next().unwrap().await, Ok(()));
        for handle in handles {
            assert_eq!(handle.await, Err(QueueError::Closed));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_interval_wait() {
        let queue = RateLimitedQueue::new(2, Duration::from_secs(60));
        let started = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let started = started.clone();
                queue.submit(move || async move {
                    started.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        settle().await;

        let begin = Instant::now();
        queue.shutdown(Duration::from_secs(5)).await.unwrap();

        assert!(begin.elapsed() < Duration::from_secs(60));
        assert_eq!(started.load(Ordering::SeqCst), 1);
        let results: Vec<_> = futures::future::join_all(handles).await;
        assert_eq!(results, vec![Ok(()), Err(QueueError::Closed)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_counts_running_tasks_during_drain() {
        let queue = RateLimitedQueue::new(3, Duration::ZERO);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let task = queue.submit(move || async move {
            let _ = release_rx.await;
        });
        settle().await;

        let observe = async {
            settle().await;
            let during = queue.in_flight();
            release_tx.send(()).unwrap();
            during
        };
        let (drained, during) = tokio::join!(queue.shutdown(Duration::from_secs(5)), observe);

        drained.unwrap();
        assert_eq!(during, 1);
        assert_eq!(queue.in_flight(), 0);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_times_out_on_slow_task() {
        let queue = RateLimitedQueue::new(1, Duration::ZERO);
        let _slow = queue.submit(|| tokio::time::sleep(Duration::from_secs(60)));
        tokio::task::yield_now().await;

        let result = queue.shutdown(Duration::from_secs(1)).await;

        assert_eq!(result, Err(QueueError::DrainTimeout(Duration::from_secs(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_shutdown_is_noop() {
        let queue = RateLimitedQueue::new(1, Duration::ZERO);
        queue.shutdown(Duration::from_secs(1)).await.unwrap();
        queue.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_track_progress() {
        let queue = RateLimitedQueue::new(1, Duration::ZERO);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = queue.submit(move || async move {
            let _ = release_rx.await;
        });
        let second = queue.submit(|| async {});

        // Let the dispatcher start the first task
        settle().await;
        assert_eq!(queue.in_flight(), 1);
        assert_eq!(queue.pending(), 1);

        release_tx.send(()).unwrap();
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(queue.pending(), 0);
    }
}
