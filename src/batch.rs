// Sequential bulk operations.
// Runs one remote action at a time with a fixed pause, publishing progress.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::Result;

/// Progress of an in-flight bulk follow or star.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: bool,
}

impl CopyProgress {
    /// Fresh state for a batch of `total` items.
    pub fn start(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            in_progress: true,
        }
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed() as f64 * 100.0 / self.total as f64
    }
}

/// Runs batches and broadcasts [`CopyProgress`] after every unit.
#[derive(Debug)]
pub struct BatchRunner {
    delay: Duration,
    progress: watch::Sender<CopyProgress>,
}

impl BatchRunner {
    pub fn new(delay: Duration) -> Self {
        let (progress, _) = watch::channel(CopyProgress::default());
        Self { delay, progress }
    }

    /// Observe progress of current and future batches.
    pub fn subscribe(&self) -> watch::Receiver<CopyProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> CopyProgress {
        *self.progress.borrow()
    }

    /// Apply `op` to each item in order, awaiting each before the next and
    /// pausing between them. Unit failures are counted, never returned.
    /// Cancelling `cancel` stops before the next unit.
    pub async fn run<I, F, Fut>(
        &self,
        items: Vec<I>,
        cancel: &CancellationToken,
        mut op: F,
    ) -> CopyProgress
    where
        I: Display,
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let total = items.len();
        self.progress.send_replace(CopyProgress::start(total));
        info!("Starting batch of {total} operations");

        for (index, item) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Batch cancelled after {index} of {total} operations");
                break;
            }

            let label = item.to_string();
            match op(item).await {
                Ok(()) => self.progress.send_modify(|p| p.completed += 1),
                Err(e) => {
                    error!("Batch operation for {label} failed: {e}");
                    self.progress.send_modify(|p| p.failed += 1);
                }
            }

            if index + 1 < total && !self.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        self.progress.send_modify(|p| p.in_progress = false);
        let done = self.progress();
        info!(
            "Batch finished: {} completed, {} failed of {}",
            done.completed, done.failed, done.total
        );
        done
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;
    use crate::error::GhdashError;

    #[tokio::test]
    async fn test_partial_failure_continues() {
        let runner = BatchRunner::new(Duration::ZERO);
        let done = Mutex::new(Vec::new());

        let result = runner
            .run(vec![1, 2, 3], &CancellationToken::new(), |item| {
                let done = &done;
                async move {
                    if item == 2 {
                        return Err(GhdashError::Other("rejected".into()));
                    }
                    done.lock().unwrap().push(item);
                    Ok(())
                }
            })
            .await;

        assert_eq!(
            result,
            CopyProgress {
                total: 3,
                completed: 2,
                failed: 1,
                in_progress: false,
            }
        );
        assert_eq!(*done.lock().unwrap(), vec![1, 3]);
        assert_eq!(runner.progress(), result);
    }

    #[tokio::test]
    async fn test_progress_is_published_per_unit() {
        let runner = BatchRunner::new(Duration::ZERO);
        let rx = runner.subscribe();
        let seen = Mutex::new(Vec::new());

        runner
            .run(vec!["a", "b"], &CancellationToken::new(), |_| {
                let snapshot = *rx.borrow();
                seen.lock().unwrap().push(snapshot.processed());
                async { Ok(()) }
            })
            .await;

        // Each unit sees the count from before it ran
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
        assert_eq!(rx.borrow().completed, 2);
        assert!(!rx.borrow().in_progress);
    }

    #[tokio::test]
    async fn test_reset_between_batches() {
        let runner = BatchRunner::new(Duration::ZERO);
        let cancel = CancellationToken::new();

        runner
            .run(vec![1], &cancel, |_| async {
                Err(GhdashError::Other("no".into()))
            })
            .await;
        let second = runner.run(vec![1, 2], &cancel, |_| async { Ok(()) }).await;

        assert_eq!(second.failed, 0);
        assert_eq!(second.completed, 2);
        assert_eq!(second.total, 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_remaining_units() {
        let runner = BatchRunner::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let result = runner
            .run(vec![1, 2, 3], &cancel, |_| {
                // Cancel during the first unit; the pause is cut short
                cancel.cancel();
                async { Ok(()) }
            })
            .await;

        assert_eq!(result.completed, 1);
        assert_eq!(result.total, 3);
        assert!(!result.in_progress);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pauses_between_units() {
        let runner = BatchRunner::new(Duration::from_millis(20));
        let started = Instant::now();

        runner
            .run(vec![1, 2, 3], &CancellationToken::new(), |_| async { Ok(()) })
            .await;

        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_percent() {
        let mut progress = CopyProgress::start(4);
        assert_eq!(progress.percent(), 0.0);
        progress.completed = 1;
        progress.failed = 1;
        assert_eq!(progress.percent(), 50.0);
        assert_eq!(CopyProgress::start(0).percent(), 100.0);
    }
}
