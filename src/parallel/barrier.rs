//! Completion barrier, per-worker completion guard and the channel closer
//!
//! The result channel of a batch closes when its last sender is dropped.
//! Every worker holds a [`CompletionGuard`] wrapping one sender clone and the
//! [`Waiter`] holds the original. A guard sends at most once, drops its
//! sender, and only then arrives at the barrier, so by the time the barrier
//! reaches zero the waiter owns the last sender and dropping it closes the
//! channel. No other component can close it and nothing can send afterwards.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ThumbnailError;
use crate::parallel::signal::{Completion, Outcome, WorkItem};

/// Countdown shared by the workers of one batch
///
/// Cloning is cheap and every clone observes the same count.
#[derive(Debug, Clone)]
pub struct CompletionBarrier {
    inner: Arc<BarrierState>,
}

#[derive(Debug)]
struct BarrierState {
    remaining: AtomicUsize,
    zero: Notify,
}

impl CompletionBarrier {
    /// Create a barrier expecting `count` arrivals
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new(BarrierState {
                remaining: AtomicUsize::new(count),
                zero: Notify::new(),
            }),
        }
    }

    /// Workers that have not arrived yet
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Record one arrival, waking the waiter on the last one
    pub fn arrive(&self) {
        let previous = self
            .inner
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => {
                debug!("Last worker arrived");
                self.inner.zero.notify_one();
            }
            Ok(_) => {}
            Err(_) => warn!("Arrival on an already drained completion barrier"),
        }
    }

    /// Wait until every expected worker has arrived
    pub async fn wait(&self) {
        loop {
            // Registered before the check so a concurrent last arrival is not missed.
            let notified = self.inner.zero.notified();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Scoped decrement-and-signal for one worker
///
/// [`signal`](Self::signal) sends the item's completion. If the guard is
/// dropped without signalling (panic, cancelled task) it sends a `Panicked`
/// failure instead. Either way it arrives at the barrier exactly once, even
/// when the send fails because the collector is gone.
#[derive(Debug)]
pub struct CompletionGuard {
    item: WorkItem,
    sender: Option<UnboundedSender<Completion>>,
    barrier: CompletionBarrier,
}

impl CompletionGuard {
    pub fn new(
        item: WorkItem,
        sender: UnboundedSender<Completion>,
        barrier: CompletionBarrier,
    ) -> Self {
        Self {
            item,
            sender: Some(sender),
            barrier,
        }
    }

    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// Emit the item's completion signal and release the guard
    pub fn signal(mut self, outcome: Outcome) {
        self.send(outcome);
    }

    fn send(&mut self, outcome: Outcome) {
        let Some(sender) = self.sender.take() else {
            return;
        };

        let completion = Completion::new(self.item.clone(), outcome);
        if sender.send(completion).is_err() {
            warn!("Collector gone, dropping completion for {}", self.item);
        } else {
            debug!("Signalled completion for {}", self.item);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.sender.is_some() {
            let message = if std::thread::panicking() {
                "worker panicked"
            } else {
                "worker exited without reporting a result"
            };
            let error = ThumbnailError::panicked(self.item.path(), message);
            self.send(Outcome::Failed(error));
        }
        self.barrier.arrive();
    }
}

/// Sole closer of a batch's result channel
pub struct Waiter;

impl Waiter {
    /// Start waiting on `barrier`; `sender` is dropped once it reaches zero
    pub fn spawn(
        barrier: CompletionBarrier,
        sender: UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("Waiting for {} workers", barrier.remaining());
            barrier.wait().await;
            debug!("Done waiting, closing result channel");
            drop(sender);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_empty_barrier_is_open() {
        let barrier = CompletionBarrier::new(0);
        tokio::time::timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("empty barrier must not block");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_barrier_releases_after_all_arrivals() {
        let barrier = CompletionBarrier::new(16);
        for _ in 0..16 {
            let barrier = barrier.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                barrier.arrive();
            });
        }

        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier never released");
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_extra_arrival_does_not_underflow() {
        let barrier = CompletionBarrier::new(1);
        barrier.arrive();
        barrier.arrive();
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_guard_signals_once_and_arrives() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let barrier = CompletionBarrier::new(1);
        let item = WorkItem::new("a.png");

        let guard = CompletionGuard::new(item.clone(), tx, barrier.clone());
        guard.signal(Outcome::Thumbnail(item.destination()));

        let completion = rx.recv().await.unwrap();
        assert!(completion.is_success());
        assert_eq!(barrier.remaining(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_guard_reports_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let barrier = CompletionBarrier::new(1);

        drop(CompletionGuard::new(WorkItem::new("b.png"), tx, barrier.clone()));

        let completion = rx.recv().await.unwrap();
        assert!(matches!(
            completion.error(),
            Some(ThumbnailError::Panicked { .. })
        ));
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_guard_arrives_when_collector_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let barrier = CompletionBarrier::new(1);

        let guard = CompletionGuard::new(WorkItem::new("c.png"), tx, barrier.clone());
        guard.signal(Outcome::Thumbnail("c.png.thumb.jpg".into()));

        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_still_signals() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let barrier = CompletionBarrier::new(1);
        let guard = CompletionGuard::new(WorkItem::new("d.png"), tx, barrier.clone());

        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("transform exploded");
        });
        assert!(handle.await.unwrap_err().is_panic());

        let completion = rx.recv().await.unwrap();
        match completion.error() {
            Some(ThumbnailError::Panicked { message, .. }) => assert_eq!(message, "worker panicked"),
            other => panic!("unexpected completion: {other:?}"),
        }
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_waiter_closes_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let barrier = CompletionBarrier::new(2);
        let guards: Vec<_> = ["x.png", "y.png"]
            .into_iter()
            .map(|name| CompletionGuard::new(WorkItem::new(name), tx.clone(), barrier.clone()))
            .collect();
        let waiter = Waiter::spawn(barrier, tx);

        for guard in guards {
            let destination = guard.item().destination();
            guard.signal(Outcome::Thumbnail(destination));
        }

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 2);
        waiter.await.unwrap();
    }
}
