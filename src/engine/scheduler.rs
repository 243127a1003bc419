//! Interval-aligned scan scheduling.
//!
//! The scheduler is a small state machine over an injectable [`Clock`]:
//!
//! - `Idle`: wait one poll period, then check whether the current local
//!   minute of the hour is a multiple of the interval.
//! - `Scanning`: run one [`Scanner::scan`] over every search term.
//! - `Recorded`: fold the outcome into [`ScheduleState`], then cool down
//!   long enough that the same due minute cannot fire twice.
//!
//! Failed scans are not retried early; the next chance is the next aligned
//! boundary. In test mode exactly one scan runs immediately and control
//! returns to the caller.

use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::config::{validate_interval, ScheduleConfig};
use crate::engine::clock::Clock;
use crate::engine::scanner::{ScanReport, Scanner};
use crate::types::{utc_and_local, ConfigError, ScanOutcome, ScheduleState};

// ---------------------------------------------------------------------------
// Interval arithmetic
// ---------------------------------------------------------------------------

/// Whether a scan is due at `now` for an interval in minutes.
///
/// Only the minute of the hour is considered. An interval of zero is
/// never due.
pub fn is_due<T: Timelike>(now: &T, interval_minutes: u32) -> bool {
    interval_minutes != 0 && now.minute() % interval_minutes == 0
}

/// Start of the first due minute at or after the minute containing `now`,
/// aligned in `now`'s own time zone.
pub fn next_due_time<Tz: TimeZone>(now: DateTime<Tz>, interval_minutes: u32) -> DateTime<Tz> {
    let mut next = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    if interval_minutes == 0 {
        return next;
    }
    // At most 59 steps for any interval up to 60.
    for _ in 0..60 {
        if is_due(&next, interval_minutes) {
            break;
        }
        next += chrono::Duration::minutes(1);
    }
    next
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of the scheduler for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub interval_minutes: u32,
    pub now: DateTime<Utc>,
    pub next_scheduled: DateTime<Utc>,
    /// Local offset used for alignment and display.
    pub local_offset: FixedOffset,
    pub state: ScheduleState,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.state;
        writeln!(f, "Scan interval:  {} minutes", self.interval_minutes)?;
        let local = self.local_offset;
        writeln!(f, "Last scan at:   {}", s.last_scan_display(local))?;
        writeln!(f, "Current time:   {}", utc_and_local(self.now, local))?;
        writeln!(f, "Next scheduled: {}", utc_and_local(self.next_scheduled, local))?;
        writeln!(f, "Success rate:   {} / {}", s.success_count, s.attempt_count)?;
        writeln!(f, "Failure rate:   {} / {}", s.failure_count, s.attempt_count)?;
        write!(f, "Last attempt:   {}", s.last_outcome_display())
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Recorded,
}

pub struct Scheduler {
    scanner: Scanner,
    clock: Arc<dyn Clock>,
    terms: Vec<String>,
    interval_minutes: u32,
    poll: Duration,
    cooldown: Duration,
    test_mode: bool,
    phase: Phase,
    state: ScheduleState,
}

impl Scheduler {
    /// Build a scheduler. Rejects intervals that do not divide the hour.
    pub fn new(
        scanner: Scanner,
        clock: Arc<dyn Clock>,
        terms: Vec<String>,
        config: &ScheduleConfig,
    ) -> Result<Self, ConfigError> {
        validate_interval(config.interval_minutes)?;
        Ok(Self {
            scanner,
            clock,
            terms,
            interval_minutes: config.interval_minutes,
            poll: config.poll(),
            cooldown: config.cooldown(),
            test_mode: config.test_mode,
            phase: Phase::Idle,
            state: ScheduleState::new(),
        })
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn status(&self) -> StatusSnapshot {
        let now = self.clock.now();
        let local_offset = self.clock.local_offset(now);
        let next_local = next_due_time(now.with_timezone(&local_offset), self.interval_minutes);
        StatusSnapshot {
            interval_minutes: self.interval_minutes,
            now,
            next_scheduled: next_local.with_timezone(&Utc),
            local_offset,
            state: self.state.clone(),
        }
    }

    /// Drive the loop.
    ///
    /// In test mode this performs one immediate scan and returns. Otherwise
    /// it runs until the task is dropped.
    pub async fn run(&mut self) {
        if self.test_mode {
            self.run_once().await;
            return;
        }

        let status = self.status();
        info!(
            interval_minutes = self.interval_minutes,
            terms = self.terms.len(),
            next = %utc_and_local(status.next_scheduled, status.local_offset),
            "Waiting for next scheduled time"
        );

        loop {
            self.tick().await;
        }
    }

    /// One immediate scan regardless of the clock, with no waiting after.
    pub async fn run_once(&mut self) -> ScanReport {
        let report = self.attempt().await;
        info!(outcome = %report.outcome, "Immediate scan finished");
        report
    }

    /// One idle poll, and a scan plus cooldown if the current local minute
    /// is due.
    ///
    /// In test mode the first call scans immediately without polling or
    /// cooling down; every later call is `NotDue`.
    pub async fn tick(&mut self) -> ScanOutcome {
        if self.test_mode {
            if self.state.attempt_count > 0 {
                return ScanOutcome::NotDue;
            }
            return self.run_once().await.outcome;
        }

        self.clock.sleep(self.poll).await;

        let local = self.clock.local_now();
        if !is_due(&local, self.interval_minutes) {
            trace!(minute = local.minute(), "Not due");
            return ScanOutcome::NotDue;
        }

        let report = self.attempt().await;
        info!("\n{}", self.status());

        // Due checks are per second but due windows are per minute.
        self.clock.sleep(self.cooldown).await;
        report.outcome
    }

    /// Scanning → Recorded → Idle.
    async fn attempt(&mut self) -> ScanReport {
        self.transition(Phase::Scanning);
        let report = self.scanner.scan(&self.terms).await;

        self.transition(Phase::Recorded);
        self.state.record(report.outcome, report.started_at);
        match report.outcome {
            ScanOutcome::Succeeded => info!(
                run_id = %report.run_id,
                items = report.estimates.len(),
                skipped = report.skipped.len(),
                attempts = self.state.attempt_count,
                "Scan succeeded"
            ),
            _ => error!(
                run_id = %report.run_id,
                skipped = report.skipped.len(),
                attempts = self.state.attempt_count,
                failures = self.state.failure_count,
                "Scan failed"
            ),
        }

        self.transition(Phase::Idle);
        report
    }

    fn transition(&mut self, to: Phase) {
        debug!(from = ?self.phase, to = ?to, "Scheduler phase");
        self.phase = to;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
