//! Single price scan.
//!
//! Walks the search-term list once: fetch listing prices for each term
//! from the quote source, reduce them to an estimate, then persist the
//! whole estimate set under a millisecond-timestamp run id. A term that
//! cannot be fetched or estimated is skipped with a warning; only an empty
//! result set or a storage failure fails the scan.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::engine::clock::Clock;
use crate::estimator::{estimate, EstimationParameters};
use crate::sources::QuoteSource;
use crate::storage::ResultStore;
use crate::types::{ItemEstimate, ScanOutcome};

// ---------------------------------------------------------------------------
// Scan report
// ---------------------------------------------------------------------------

/// A search term that produced no estimate this scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTerm {
    pub term: String,
    pub reason: String,
}

/// Everything that happened during one scan attempt.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Millisecond epoch timestamp of the scan start.
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub estimates: ItemEstimate,
    pub skipped: Vec<SkippedTerm>,
    /// Result file, when the scan got as far as saving.
    pub saved_to: Option<PathBuf>,
    /// Always `Failed` or `Succeeded`.
    pub outcome: ScanOutcome,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct Scanner {
    source: Box<dyn QuoteSource>,
    store: Box<dyn ResultStore>,
    clock: Arc<dyn Clock>,
    params: EstimationParameters,
    /// Minimum gap between consecutive quote requests.
    pacing: Duration,
}

impl Scanner {
    pub fn new(
        source: Box<dyn QuoteSource>,
        store: Box<dyn ResultStore>,
        clock: Arc<dyn Clock>,
        params: EstimationParameters,
        pacing: Duration,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            params,
            pacing,
        }
    }

    /// Run one full scan over `terms` and persist the result.
    pub async fn scan(&self, terms: &[String]) -> ScanReport {
        let started_at = self.clock.now();
        let run_id = started_at.timestamp_millis().to_string();

        info!(run_id = %run_id, terms = terms.len(), "Scanning for items");

        let (estimates, skipped) = self.collect_estimates(terms).await;

        let mut report = ScanReport {
            run_id,
            started_at,
            estimates,
            skipped,
            saved_to: None,
            outcome: ScanOutcome::Failed,
        };

        if report.estimates.is_empty() {
            warn!(run_id = %report.run_id, "Could not get price for any items");
            return report;
        }

        match self.store.save(&report.run_id, &report.estimates) {
            Ok(path) => {
                info!(
                    run_id = %report.run_id,
                    path = %path.display(),
                    items = report.estimates.len(),
                    skipped = report.skipped.len(),
                    "Scan results saved"
                );
                report.saved_to = Some(path);
                report.outcome = ScanOutcome::Succeeded;
            }
            Err(e) => {
                error!(run_id = %report.run_id, error = %e, "Could not write results");
            }
        }

        report
    }

    /// Fetch and estimate every term, pacing requests to the source.
    pub async fn collect_estimates(&self, terms: &[String]) -> (ItemEstimate, Vec<SkippedTerm>) {
        let mut estimates = ItemEstimate::new();
        let mut skipped = Vec::new();

        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                self.clock.sleep(self.pacing).await;
            }

            let prices = match self.source.fetch_prices(term).await {
                Ok(prices) => prices,
                Err(e) => {
                    warn!(term = %term, error = %e, "Skipping item: fetch failed");
                    skipped.push(SkippedTerm {
                        term: term.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match estimate(&prices, &self.params) {
                Ok(price) => {
                    info!(term = %term, price = format!("${price:.2}"), samples = prices.len(), "Item estimated");
                    estimates.insert(term.clone(), price);
                }
                Err(e) => {
                    warn!(term = %term, error = %e, "Skipping item: no usable estimate");
                    skipped.push(SkippedTerm {
                        term: term.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (estimates, skipped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
