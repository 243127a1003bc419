//! Robust price estimation.
//!
//! Turns a noisy set of listing prices into a single market value using
//! an outlier-filtered trimmed mean: keep the central slice of the sorted
//! sample, drop anything too far from the median, average the rest.

use tracing::debug;

use crate::types::EstimateError;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Default central proportion of the sorted sample to keep.
pub const DEFAULT_RANGE_FRACTION: f64 = 0.68;

/// Default maximum multiplicative deviation from the median.
pub const DEFAULT_OUTLIER_FACTOR: f64 = 3.0;

/// Immutable estimator tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimationParameters {
    /// Central proportion of the sorted sample to consider, in (0, 1].
    range_fraction: f64,
    /// Prices below `median / factor` or above `median * factor` are dropped. At least 1.
    outlier_factor: f64,
}

impl Default for EstimationParameters {
    fn default() -> Self {
        Self {
            range_fraction: DEFAULT_RANGE_FRACTION,
            outlier_factor: DEFAULT_OUTLIER_FACTOR,
        }
    }
}

impl EstimationParameters {
    pub fn new(range_fraction: f64, outlier_factor: f64) -> Result<Self, EstimateError> {
        if !range_fraction.is_finite() || range_fraction <= 0.0 || range_fraction > 1.0 {
            return Err(EstimateError::InvalidParameter {
                name: "range_fraction",
                value: range_fraction,
            });
        }
        if !outlier_factor.is_finite() || outlier_factor < 1.0 {
            return Err(EstimateError::InvalidParameter {
                name: "outlier_factor",
                value: outlier_factor,
            });
        }
        Ok(Self {
            range_fraction,
            outlier_factor,
        })
    }

    /// Build from possibly-absent values, e.g. partially filled config.
    pub fn from_parts(
        range_fraction: Option<f64>,
        outlier_factor: Option<f64>,
    ) -> Result<Self, EstimateError> {
        let range_fraction = range_fraction.ok_or(EstimateError::MissingParameter("range_fraction"))?;
        let outlier_factor = outlier_factor.ok_or(EstimateError::MissingParameter("outlier_factor"))?;
        Self::new(range_fraction, outlier_factor)
    }

    pub fn range_fraction(&self) -> f64 {
        self.range_fraction
    }

    pub fn outlier_factor(&self) -> f64 {
        self.outlier_factor
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Estimate a market price from raw listing prices.
///
/// Sorts the sample, takes the `range_fraction` slice centred on the median
/// element, discards candidates outside `[median / factor, median * factor]`
/// and returns the mean of what remains.
///
/// Non-positive prices are not rejected; validating raw input is the
/// quote source's job.
pub fn estimate(prices: &[f64], params: &EstimationParameters) -> Result<f64, EstimateError> {
    let n = prices.len();
    if n == 0 {
        return Err(EstimateError::InsufficientData);
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);

    let median_index = n / 2;
    let median = sorted[median_index];

    let half_width = (n as f64 * (params.range_fraction / 2.0)).floor() as usize;
    let lower = median_index.saturating_sub(half_width);
    let upper = (median_index + half_width).min(n);

    let low_cut = median / params.outlier_factor;
    let high_cut = median * params.outlier_factor;

    let survivors: Vec<f64> = sorted[lower..upper]
        .iter()
        .copied()
        .filter(|&p| !(p < low_cut || p > high_cut))
        .collect();

    if survivors.is_empty() {
        return Err(EstimateError::AllFiltered);
    }

    let mean = survivors.iter().sum::<f64>() / survivors.len() as f64;

    debug!(
        samples = n,
        candidates = upper - lower,
        survivors = survivors.len(),
        median,
        mean,
        "Price estimated"
    );

    Ok(mean)
}

/// Nullable-argument form of [`estimate`].
///
/// Any absent input fails with [`EstimateError::MissingParameter`].
pub fn estimate_price(
    prices: Option<&[f64]>,
    range_fraction: Option<f64>,
    outlier_factor: Option<f64>,
) -> Result<f64, EstimateError> {
    let prices = prices.ok_or(EstimateError::MissingParameter("prices"))?;
    let params = EstimationParameters::from_parts(range_fraction, outlier_factor)?;
    estimate(prices, &params)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
