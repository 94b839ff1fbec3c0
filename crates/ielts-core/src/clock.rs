//! Periodic tick source for a practice session.
//!
//! The clock only delivers ticks. Everything a tick means is decided by the
//! session controller. Arming returns a [`ClockHandle`] that owns the
//! cancellation side and a [`Ticks`] stream for the single subscriber.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A single tick. `seq` counts from 1 within one armed clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub seq: u64,
}

/// Tick source configuration.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    period: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self::per_second()
    }
}

impl Clock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// The 1 Hz clock used for real sessions.
    pub fn per_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    /// Start ticking. Must be called inside a tokio runtime.
    ///
    /// The first tick arrives one period after arming.
    pub fn arm(&self) -> (ClockHandle, Ticks) {
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let cancelled = cancel_tx.subscribe();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    _ = interval.tick() => {
                        seq += 1;
                        if tick_tx.send(Tick { seq }).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("clock stopped after {seq} ticks");
        });

        let handle = ClockHandle {
            cancel: cancel_tx,
            task,
        };
        let ticks = Ticks {
            rx: tick_rx,
            cancelled,
        };
        (handle, ticks)
    }
}

/// Owner of an armed clock. Dropping it cancels the clock.
#[derive(Debug)]
pub struct ClockHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ClockHandle {
    /// Stop ticking. Idempotent.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
        self.task.abort();
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The subscriber side of an armed clock.
#[derive(Debug)]
pub struct Ticks {
    rx: mpsc::Receiver<Tick>,
    cancelled: watch::Receiver<bool>,
}

impl Ticks {
    /// Wait for the next tick. Returns `None` once the clock is cancelled,
    /// including when a tick was already buffered.
    pub async fn next(&mut self) -> Option<Tick> {
        if *self.cancelled.borrow() {
            return None;
        }
        let tick = tokio::select! {
            biased;
            _ = self.cancelled.changed() => None,
            tick = self.rx.recv() => tick,
        };
        if *self.cancelled.borrow() {
            return None;
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let clock = Clock::per_second();
        let (_handle, mut ticks) = clock.arm();

        let start = Instant::now();
        for expected in 1..=3 {
            let tick = ticks.next().await.unwrap();
            assert_eq!(tick.seq, expected);
        }
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_delivery_immediately() {
        let clock = Clock::new(Duration::from_millis(100));
        let (handle, mut ticks) = clock.arm();
        assert!(ticks.next().await.is_some());

        // Let the next tick land in the buffer before cancelling.
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.cancel();
        assert_eq!(ticks.next().await, None);
        assert_eq!(ticks.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels() {
        let clock = Clock::per_second();
        let (handle, mut ticks) = clock.arm();
        drop(handle);
        assert_eq!(ticks.next().await, None);
    }
}
