use std::future::Future;
use std::time::Duration;

use rand_core::RngCore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const PROGRESS_CAP: u8 = 95;
pub const MIN_INCREMENT: u8 = 2;
pub const MAX_INCREMENT: u8 = 8;

/// Handle to a background task that must not outlive its owner.
///
/// Dropping the handle aborts the task. [`ScheduledTask::cancel`] additionally waits until
/// the task has stopped, so no side effect of the task can be observed afterwards.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    pub async fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // A cancelled join error is the expected outcome here.
            let _ = handle.await;
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Pseudo progress shown while a remote analysis is outstanding. It has no relationship to
/// the real call and never passes [`PROGRESS_CAP`].
pub struct ProgressSimulator {
    progress: u8,
    rng: Box<dyn RngCore + Send>,
}

impl ProgressSimulator {
    pub fn new(rng: Box<dyn RngCore + Send>) -> Self {
        Self { progress: 0, rng }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Advances by a random increment in `[MIN_INCREMENT, MAX_INCREMENT]`, capped.
    pub fn advance(&mut self) -> u8 {
        let span = u32::from(MAX_INCREMENT - MIN_INCREMENT) + 1;
        let increment = MIN_INCREMENT + (self.rng.next_u32() % span) as u8;
        self.progress = self.progress.saturating_add(increment).min(PROGRESS_CAP);
        self.progress
    }

    /// Ticks every `tick`, handing each new value to `sink`. The first update happens one
    /// full tick after start.
    pub fn start<S>(mut self, tick: Duration, mut sink: S) -> ScheduledTask
    where
        S: FnMut(u8) + Send + 'static,
    {
        ScheduledTask::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                let before = self.progress;
                let after = self.advance();
                if after != before {
                    sink(after);
                }
            }
        })
    }
}
