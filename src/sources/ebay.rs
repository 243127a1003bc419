//! eBay auction listing scraper.
//!
//! Searches eBay for auction listings matching a term (sorted by ending
//! soonest) and pulls the displayed prices out of the result page HTML.
//!
//! Search URL: https://www.ebay.com/sch/i.html?_nkw={term}&_sacat=0&LH_Auction=1&_sop=1
//! Prices live in `<span class="s-item__price">$123.45</span>` elements.
//! No API key; a browser-like User-Agent is required or eBay serves a
//! bot-check page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::QuoteSource;
use crate::config::SourceConfig;
use crate::types::FetchError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SOURCE_NAME: &str = "ebay";

/// Category 0 = all categories, auctions only, sorted by time ending soonest.
const SEARCH_FILTERS: &str = "_sacat=0&LH_Auction=1&_sop=1";

static PRICE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*class\s*=\s*["'][^"']*\bs-item__price\b[^"']*["'][^>]*>(.*?)</span>"#)
        .expect("valid price span regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

// ---------------------------------------------------------------------------
// HTML parsing
// ---------------------------------------------------------------------------

/// Convert one price element's text to a number.
///
/// Accepts `$1,234.56` style values. Ranges (`$5.00 to $9.00`) and
/// anything else non-numeric yield `None`.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .replace("&nbsp;", " ")
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Extract every parseable listing price from a search result page.
pub fn parse_prices(html: &str) -> Vec<f64> {
    let mut prices = Vec::new();
    for cap in PRICE_SPAN_RE.captures_iter(html) {
        let inner = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        let text = TAG_RE.replace_all(inner, "");
        if text.trim().is_empty() {
            warn!("Empty text encountered instead of item price");
            continue;
        }
        match parse_price_text(&text) {
            Some(price) => prices.push(price),
            None => warn!(raw = %text.trim(), "Could not convert price value to float"),
        }
    }
    prices
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// eBay search-page quote source.
pub struct EbayClient {
    http: Client,
    base_url: String,
    min_results: usize,
}

impl EbayClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client for eBay")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            min_results: config.min_results,
        })
    }

    /// Search URL for a term.
    pub fn search_url(&self, term: &str) -> String {
        format!(
            "{}/sch/i.html?_nkw={}&{SEARCH_FILTERS}",
            self.base_url,
            urlencoding::encode(term),
        )
    }
}

#[async_trait]
impl QuoteSource for EbayClient {
    async fn fetch_prices(&self, term: &str) -> Result<Vec<f64>, FetchError> {
        let url = self.search_url(term);
        debug!(url = %url, "Fetching eBay listings");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                term: term.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                term: term.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|source| FetchError::Body {
            term: term.to_string(),
            source,
        })?;

        let prices = parse_prices(&body);
        if prices.len() < self.min_results {
            return Err(FetchError::TooFewPrices {
                term: term.to_string(),
                found: prices.len(),
                required: self.min_results,
            });
        }

        debug!(term, count = prices.len(), "Prices parsed");
        Ok(prices)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
