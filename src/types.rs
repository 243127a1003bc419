//! Core domain types shared across pricewatch modules.
//!
//! Everything the estimator, scanner, scheduler and storage layers pass
//! between each other lives here: the per-scan estimate map, scan
//! outcomes, the scheduler's bookkeeping state and the error taxonomy.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Item estimates
// ---------------------------------------------------------------------------

/// Estimated market price per search term, produced once per scan.
///
/// Serialises transparently as a JSON object `{ "term": price, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemEstimate(BTreeMap<String, f64>);

impl ItemEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the estimate for a term, replacing any earlier value.
    pub fn insert(&mut self, term: impl Into<String>, price: f64) {
        self.0.insert(term.into(), price);
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.0.get(term).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scan outcome
// ---------------------------------------------------------------------------

/// Result of attempting a scan at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOutcome {
    /// The clock was not on an interval boundary; nothing ran.
    NotDue,
    /// A scan ran but produced no usable estimates or could not be saved.
    Failed,
    /// A scan ran and its results were persisted.
    Succeeded,
}

impl ScanOutcome {
    /// Whether this outcome represents an actual scan attempt.
    pub fn is_attempt(self) -> bool {
        !matches!(self, ScanOutcome::NotDue)
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::NotDue => write!(f, "Not due"),
            ScanOutcome::Failed => write!(f, "Failure"),
            ScanOutcome::Succeeded => write!(f, "Success"),
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule state
// ---------------------------------------------------------------------------

/// `HH:MM:SS UTC (HH:MM local)`, the form every status line uses.
pub fn utc_and_local(ts: DateTime<Utc>, local: FixedOffset) -> String {
    format!(
        "{} UTC ({} local)",
        ts.format("%H:%M:%S"),
        ts.with_timezone(&local).format("%H:%M")
    )
}

/// Process-lifetime scan statistics, owned by the scheduler.
///
/// Never persisted; a restart begins from zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    /// Start time of the most recent attempt.
    pub last_scan: Option<DateTime<Utc>>,
    pub attempt_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Outcome of the most recent attempt (never `NotDue`).
    pub last_outcome: Option<ScanOutcome>,
}

impl ScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a scan outcome into the statistics.
    ///
    /// `NotDue` leaves the state untouched. Returns whether anything changed.
    pub fn record(&mut self, outcome: ScanOutcome, started_at: DateTime<Utc>) -> bool {
        match outcome {
            ScanOutcome::NotDue => return false,
            ScanOutcome::Succeeded => self.success_count += 1,
            ScanOutcome::Failed => self.failure_count += 1,
        }
        self.attempt_count += 1;
        self.last_scan = Some(started_at);
        self.last_outcome = Some(outcome);
        true
    }

    /// "N/A" before the first attempt, otherwise the last scan in UTC and local time.
    pub fn last_scan_display(&self, local: FixedOffset) -> String {
        match self.last_scan {
            Some(ts) => utc_and_local(ts, local),
            None => "N/A".to_string(),
        }
    }

    pub fn last_outcome_display(&self) -> String {
        match self.last_outcome {
            Some(outcome) => outcome.to_string(),
            None => "N/A".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why the estimator could not produce a price.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimateError {
    #[error("Missing estimator parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid estimator parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("No prices to estimate from")]
    InsufficientData,

    #[error("All prices were filtered out; data too noisy or range too tight")]
    AllFiltered,
}

/// Failure reading the search-term list.
#[derive(Debug, thiserror::Error)]
pub enum TermFileError {
    #[error("`{0}` is not a valid path")]
    NotFound(PathBuf),

    #[error("Could not read items from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} does not contain any search terms")]
    Empty(PathBuf),
}

/// Failure fetching prices for a single search term.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Query for `{term}` failed due to request error: {source}")]
    Request {
        term: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Query for `{term}` returned status {status}")]
    Status { term: String, status: u16 },

    #[error("Failed to read response body for `{term}`: {source}")]
    Body {
        term: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Found {found} prices for `{term}`, which is less than {required}")]
    TooFewPrices {
        term: String,
        found: usize,
        required: usize,
    },
}

/// Failure persisting or reading back a result set.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Result JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not write results to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read results from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Result file {path} has no entry for run {run_id}")]
    MissingRun { path: PathBuf, run_id: String },
}

/// Invalid configuration detected before the scheduler starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Interval must be between 1 and 60 minutes and divide 60 evenly, got {0}")]
    Interval(u32),

    #[error("{0}")]
    Estimator(#[from] EstimateError),

    #[error("min_results must be at least 1")]
    MinResults,

    #[error("Invalid value for {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_item_estimate_serialises_as_flat_object() {
        let mut est = ItemEstimate::new();
        est.insert("rtx 4090", 1523.456);
        est.insert("gtx 1080", 120.0);
        let json = serde_json::to_value(&est).unwrap();
        assert_eq!(json["rtx 4090"], 1523.456);
        assert_eq!(json["gtx 1080"], 120.0);
    }

    #[test]
    fn test_new_state_is_blank() {
        let state = ScheduleState::new();
        assert_eq!(state.attempt_count, 0);
        assert_eq!(state.last_scan_display(utc()), "N/A");
        assert_eq!(state.last_outcome_display(), "N/A");
    }

    #[test]
    fn test_record_not_due_is_ignored() {
        let mut state = ScheduleState::new();
        assert!(!state.record(ScanOutcome::NotDue, at(10, 0)));
        assert_eq!(state, ScheduleState::new());
    }

    #[test]
    fn test_record_counts_stay_consistent() {
        let mut state = ScheduleState::new();
        let outcomes = [
            ScanOutcome::Succeeded,
            ScanOutcome::NotDue,
            ScanOutcome::Failed,
            ScanOutcome::Succeeded,
            ScanOutcome::NotDue,
        ];
        for (i, o) in outcomes.iter().enumerate() {
            state.record(*o, at(10, i as u32));
            assert_eq!(state.success_count + state.failure_count, state.attempt_count);
        }
        assert_eq!(state.attempt_count, 3);
        assert_eq!(state.success_count, 2);
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.last_outcome, Some(ScanOutcome::Succeeded));
        assert_eq!(state.last_scan, Some(at(10, 3)));
        assert_eq!(state.last_scan_display(utc()), "10:03:00 UTC (10:03 local)");
        let nepal = FixedOffset::east_opt(5 * 3600 + 45 * 60).unwrap();
        assert_eq!(state.last_scan_display(nepal), "10:03:00 UTC (15:48 local)");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ScanOutcome::Succeeded.to_string(), "Success");
        assert_eq!(ScanOutcome::Failed.to_string(), "Failure");
        assert!(!ScanOutcome::NotDue.is_attempt());
        assert!(ScanOutcome::Failed.is_attempt());
    }

    #[test]
    fn test_error_messages() {
        let e = FetchError::TooFewPrices {
            term: "gpu".into(),
            found: 3,
            required: 10,
        };
        assert_eq!(e.to_string(), "Found 3 prices for `gpu`, which is less than 10");
        assert_eq!(
            ConfigError::Interval(7).to_string(),
            "Interval must be between 1 and 60 minutes and divide 60 evenly, got 7"
        );
    }
}
