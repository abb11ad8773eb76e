//! Small periodic-wait wrapper around `tokio::time::Interval`, used by the
//! lease ticker so its main loop reads as "wait for next period" rather than
//! dealing with `tokio::time` setup directly.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

pub(crate) struct Timer {
    interval: Interval,
}

impl Timer {
    /// Creates a timer that fires every `period`, skipping missed ticks
    /// instead of bursting to catch up (a slow broadcast should not cause
    /// the ticker to fire twice back-to-back once it returns).
    pub(crate) fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Timer { interval }
    }

    /// Waits for the next period to elapse.
    pub(crate) async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
