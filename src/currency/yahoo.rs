//! Fetches spot exchange rates from the Yahoo Finance quote endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use time::Date;

use crate::Error;

use super::RateSource;

const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const USER_AGENT: &str = concat!("buddyledger/", env!("CARGO_PKG_VERSION"));

/// Fetches the latest quote for the `FROMTO=X` currency-pair symbol.
///
/// Only the latest rate is available; the `on` date passed to
/// [RateSource::rate] is ignored. Used by the `sync_rates` binary to fill the
/// `exchange_rate` table, never on the request path.
pub struct YahooRateSource {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    result: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

impl YahooRateSource {
    /// Create a rate source backed by a fresh HTTP client.
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|error| Error::RateFetch(error.to_string()))?;

        Ok(Self { client })
    }

    /// Fetch the latest rate converting `from` into `to`.
    pub async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, Error> {
        let symbol = format!("{from}{to}=X");
        let envelope: QuoteEnvelope = self
            .client
            .get(QUOTE_URL)
            .query(&[("symbols", symbol.as_str())])
            .send()
            .await
            .map_err(|error| Error::RateFetch(error.to_string()))?
            .error_for_status()
            .map_err(|error| Error::RateFetch(error.to_string()))?
            .json()
            .await
            .map_err(|error| Error::RateFetch(error.to_string()))?;

        envelope
            .quote_response
            .result
            .first()
            .and_then(|quote| quote.regular_market_price)
            .ok_or_else(|| Error::RateFetch(format!("no market price in quote for {symbol}")))
    }
}

#[async_trait]
impl RateSource for YahooRateSource {
    async fn rate(&self, from: &str, to: &str, _on: Date) -> Result<f64, Error> {
        self.fetch_rate(from, to).await
    }
}
