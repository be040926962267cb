use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Whether a countdown keeps ticking after a tick was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// A cancellable periodic task tagged with the epoch it was started for.
///
/// Dropping the countdown aborts the task. The first tick fires one full
/// period after spawning.
#[derive(Debug)]
pub struct Countdown {
    epoch: u64,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Call `on_tick(epoch)` every `period` until it returns `TickControl::Stop`
    /// or the countdown is stopped.
    pub fn spawn<F, Fut>(epoch: u64, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if on_tick(epoch).await == TickControl::Stop {
                    break;
                }
            }
        });
        Self { epoch, task }
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
