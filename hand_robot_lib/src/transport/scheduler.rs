//! Owned handles for timer-driven work.
//!
//! Every reconnect wait, stream ticker and socket task is spawned through
//! [`ScheduledTask`]. The handle is the only way to cancel the task, and
//! dropping it cancels too, so a schedule can never outlive its owner.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `future` on the current runtime
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::trace!(task = name, "Scheduling task");
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    /// Call `tick` repeatedly. `period` is re-read before every tick so the
    /// cadence can change while the task runs. Ticks never overlap.
    pub fn every<P, T, F>(name: &'static str, mut period: P, mut tick: T) -> Self
    where
        P: FnMut() -> Duration + Send + 'static,
        T: FnMut() -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(name, async move {
            let mut next = Instant::now() + period();
            loop {
                time::sleep_until(next).await;
                tick().await;

                // Skip missed ticks instead of bursting to catch up
                next += period();
                let now = Instant::now();
                if next < now {
                    next = now;
                }
            }
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end on its own. Panics and aborts both count as
    /// finished.
    pub async fn finished(&mut self) {
        // a JoinHandle must not be polled again once it has yielded
        if !self.handle.is_finished() {
            let _ = (&mut self.handle).await;
        }
    }

    pub fn cancel(self) {
        // Drop does the abort
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::trace!(task = self.name, "Cancelling task");
        }
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_delayed_task_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = ScheduledTask::spawn("once", async move {
            time::sleep(Duration::from_secs(3)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = ScheduledTask::spawn("cancelled", async move {
            time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        task.cancel();
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_waits_for_completion() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut task = ScheduledTask::spawn("flush", async move {
            time::sleep(Duration::from_millis(500)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        task.finished().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
        // a second wait returns immediately
        task.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_follows_period_changes() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let period_ms = Arc::new(AtomicUsize::new(100));

        let counter = ticks.clone();
        let period = period_ms.clone();
        let task = ScheduledTask::every(
            "ticker",
            move || Duration::from_millis(period.load(Ordering::SeqCst) as u64),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        period_ms.store(1000, Ordering::SeqCst);
        time::sleep(Duration::from_millis(1000)).await;
        // one more tick at 400ms, then the next is 1s later at 1400ms
        assert_eq!(ticks.load(Ordering::SeqCst), 4);

        drop(task);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }
}
