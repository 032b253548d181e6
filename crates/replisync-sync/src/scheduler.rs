//! Periodic pass scheduling

use replisync_types::Result;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runs a pass immediately and then once per interval until cancelled
///
/// The interval is measured from the end of one pass to the start of the
/// next, so passes never overlap.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler sleeping `interval` between passes
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Sleep between passes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run passes until `cancel` fires, returning how many completed
    ///
    /// Cancellation only interrupts the sleep: a pass in progress is always
    /// allowed to finish. A pass returning `Err` is logged and the loop goes
    /// on to the next interval.
    pub async fn run<F, Fut, T>(&self, mut pass: F, cancel: CancellationToken) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut completed = 0u64;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let number = completed + 1;
            debug!("Starting pass {}", number);
            if let Err(e) = pass(number).await {
                error!("Pass {} failed: {}", number, e);
            }
            completed = number;

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Scheduler stopped after {} passes", completed);
        completed
    }
}
