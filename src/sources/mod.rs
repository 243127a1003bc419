//! Price quote sources.
//!
//! Defines the `QuoteSource` trait the scanner fetches listing prices
//! through, plus the concrete eBay implementation and the search-term
//! file loader.

pub mod ebay;
pub mod terms;

use async_trait::async_trait;

use crate::types::FetchError;

/// Minimum parsed prices for a fetch to count as usable.
pub const DEFAULT_MIN_RESULTS: usize = 10;

/// Abstraction over marketplaces that can quote listing prices.
///
/// Implementors return the raw prices found for a search term. Any
/// failure (network, HTTP status, too few results) is reported as a
/// [`FetchError`]; the scanner treats all of them the same way.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch raw listing prices for one search term.
    async fn fetch_prices(&self, term: &str) -> Result<Vec<f64>, FetchError>;

    /// Source name for logging.
    fn name(&self) -> &str;
}
