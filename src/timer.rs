// src/timer.rs
// Deadline-based repeating timers owned by the presentation state machine

use std::future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// A single cancellable repeating schedule. It never fires on its own: the owner
/// waits for `deadline()` and calls `fire()` when it handles the tick, so a
/// dropped wait loses nothing.
#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    period: Duration,
    next: Option<Instant>,
}

impl RepeatingTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// First tick after one period. Replaces any running schedule.
    pub fn start(&mut self) {
        self.start_after(self.period);
    }

    /// First tick after `delay`, then every period. Replaces any running schedule.
    pub fn start_after(&mut self, delay: Duration) {
        self.next = Some(Instant::now() + delay);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Acknowledge a tick and schedule the next one. No-op when cancelled.
    pub fn fire(&mut self) {
        if self.next.is_some() {
            self.next = Some(Instant::now() + self.period);
        }
    }
}

/// Sleep until the given deadline and yield its tag; pend forever on `None`.
pub async fn wait_deadline<K>(next: Option<(K, Instant)>) -> K {
    match next {
        Some((kind, deadline)) => {
            sleep_until(deadline).await;
            kind
        }
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_start_fire_cancel() {
        let mut timer = RepeatingTimer::new(Duration::from_millis(300));
        assert!(!timer.is_active());

        let t0 = Instant::now();
        timer.start_after(Duration::from_millis(180));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_millis(180)));

        wait_deadline(timer.deadline().map(|d| ((), d))).await;
        let now = Instant::now();
        assert!(now >= t0 + Duration::from_millis(180));
        timer.fire();
        assert_eq!(timer.deadline(), Some(now + Duration::from_millis(300)));

        timer.cancel();
        assert!(!timer.is_active());
        timer.fire();
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_schedule() {
        let mut timer = RepeatingTimer::new(Duration::from_millis(3500));
        timer.start();
        let first = timer.deadline();
        tokio::time::advance(Duration::from_millis(1000)).await;
        timer.start();
        assert!(timer.deadline() > first);
        assert_eq!(timer.period(), Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_deadline_none_pends() {
        let waited = tokio::time::timeout(Duration::from_secs(60), wait_deadline::<()>(None)).await;
        assert!(waited.is_err());
    }
}
