//! Admission control for outbound request fan-out
//!
//! An `AdmissionController` bounds how many tasks run at once, how many may
//! start inside a sliding time window, and how long each may take. Task
//! bodies always resolve to a value: callers fold their own failures into
//! the output type, and a task that overruns its timeout resolves to
//! `Admitted::TimedOut` rather than hanging the batch.

use futures::future::join_all;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep_until, timeout, Instant};

/// Wake-up used when `interval` is too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// Quota parameters for one admission controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Maximum number of tasks in flight at once
    pub max_concurrent: usize,

    /// Length of the sliding window
    pub interval: Duration,

    /// Maximum number of task starts inside any window
    pub interval_cap: usize,

    /// Per-task timeout
    pub timeout: Duration,
}

impl AdmissionConfig {
    /// Effectively unlimited quota, for callers that need no throttling
    pub fn unbounded() -> Self {
        Self {
            max_concurrent: Semaphore::MAX_PERMITS,
            interval: Duration::from_millis(1),
            interval_cap: usize::MAX,
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Outcome of one admitted task
#[derive(Debug, Clone, PartialEq)]
pub enum Admitted<T> {
    Completed(T),
    TimedOut,
}

/// Bounded-concurrency, sliding-window rate limiter for task batches
#[derive(Debug, Clone)]
pub struct AdmissionController {
    config: AdmissionConfig,
    permits: Arc<Semaphore>,
    window: Arc<Mutex<VecDeque<Instant>>>,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        let max_concurrent = config.max_concurrent.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            config: AdmissionConfig {
                max_concurrent,
                interval_cap: config.interval_cap.max(1),
                ..config
            },
            permits: Arc::new(Semaphore::new(max_concurrent)),
            window: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Runs one task under the quota
    ///
    /// Waits for a concurrency permit and a free window slot, then runs the
    /// task with the configured timeout.
    pub async fn run<Fut, T>(&self, task: Fut) -> Admitted<T>
    where
        Fut: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire cannot fail.
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Admitted::TimedOut,
        };

        self.wait_for_slot().await;

        match timeout(self.config.timeout, task).await {
            Ok(value) => Admitted::Completed(value),
            Err(_) => Admitted::TimedOut,
        }
    }

    /// Runs a task per input and waits until every one has resolved
    ///
    /// Results are returned in input order, each paired with its input.
    pub async fn run_all<I, F, Fut, T>(&self, inputs: Vec<I>, task: F) -> Vec<(I, Admitted<T>)>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let pending = inputs.into_iter().map(|input| {
            let fut = task(input.clone());
            async move { (input, self.run(fut).await) }
        });

        join_all(pending).await
    }

    /// Blocks until starting a task keeps the window under its cap
    async fn wait_for_slot(&self) {
        loop {
            let wake_at = {
                let mut window = self.window.lock().await;
                let now = Instant::now();

                while let Some(&started) = window.front() {
                    if now.duration_since(started) >= self.config.interval {
                        window.pop_front();
                    } else {
                        break;
                    }
                }

                if window.len() < self.config.interval_cap {
                    window.push_back(now);
                    return;
                }

                match window.front() {
                    Some(&oldest) => oldest
                        .checked_add(self.config.interval)
                        .unwrap_or_else(|| now + FAR_FUTURE),
                    None => return,
                }
            };

            tracing::trace!("Window full, waiting until {:?}", wake_at);
            sleep_until(wake_at).await;
        }
    }
}
