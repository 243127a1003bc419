//! Time source for the scheduler.
//!
//! All waiting and "what time is it" questions go through [`Clock`] so the
//! scan loop can be driven by a simulated clock in tests. The clock also
//! owns the local UTC offset, since scans align to the local minute.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Wall clock plus timed waits.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Local UTC offset in effect at `at`.
    fn local_offset(&self, at: DateTime<Utc>) -> FixedOffset {
        Local.offset_from_utc_datetime(&at.naive_utc()).fix()
    }

    /// `now` in local time.
    fn local_now(&self) -> DateTime<FixedOffset> {
        let now = self.now();
        now.with_timezone(&self.local_offset(now))
    }

    async fn sleep(&self, duration: Duration);
}

/// Real system time and `tokio` timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated clock: `sleep` returns immediately and advances `now`.
///
/// Every requested wait is recorded so callers can assert on pacing and
/// cooldown behaviour. Local time is UTC unless a fixed offset is given.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    pub fn with_offset(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(start),
            offset,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        if let Ok(step) = chrono::Duration::from_std(duration) {
            *self.now.lock().unwrap_or_else(|e| e.into_inner()) += step;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn local_offset(&self, _at: DateTime<Utc>) -> FixedOffset {
        self.offset
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.sleep(Duration::from_secs(3)).await;
        clock.sleep(Duration::from_secs(60)).await;

        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 3).unwrap());
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3), Duration::from_secs(60)]);
        assert_eq!(clock.total_slept(), Duration::from_secs(63));
    }

    #[test]
    fn test_manual_clock_advance_is_not_a_sleep() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 30).unwrap());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_manual_clock_local_offset() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap();
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let clock = ManualClock::with_offset(start, ist);

        let local = clock.local_now();
        assert_eq!(local.format("%H:%M").to_string(), "16:00");
        assert_eq!(local, start);
        assert_eq!(ManualClock::new(start).local_now().offset().local_minus_utc(), 0);
    }

    #[tokio::test]
    async fn test_system_clock_sleep() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() >= before);
    }
}
