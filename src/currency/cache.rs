//! A per-request memo over a rate source.

use std::{collections::HashMap, sync::Arc};

use time::Date;

use crate::{Error, account::Account};

use super::RateSource;

/// Caches exchange rates for the duration of one request.
///
/// Converting both legs of a transfer asks for up to three rates, some of
/// them twice; the cache guarantees the underlying source is consulted at
/// most once per `(from, to, day)` key. The cache is dropped with the
/// request.
pub struct RateCache {
    source: Arc<dyn RateSource>,
    rates: HashMap<(String, String, Date), f64>,
}

impl RateCache {
    /// Create an empty cache over `source`.
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            rates: HashMap::new(),
        }
    }

    /// The rate converting `account`'s currency into `currency` as of `on`.
    ///
    /// # Errors
    /// Returns [Error::MissingCurrency] if the account row carries a blank
    /// currency code. The legacy behavior of assuming a 1:1 rate hid data
    /// corruption.
    pub async fn rate_for_account(
        &mut self,
        account: &Account,
        currency: &str,
        on: Date,
    ) -> Result<f64, Error> {
        if account.currency.is_empty() {
            return Err(Error::MissingCurrency(account.id));
        }

        self.rate(&account.currency, currency, on).await
    }

    /// The rate converting an amount in `from` to an amount in `to` as of
    /// the day `on`.
    ///
    /// Identical currencies short-circuit to `1.0` without touching the
    /// source or the cache.
    pub async fn rate(&mut self, from: &str, to: &str, on: Date) -> Result<f64, Error> {
        if from == to {
            return Ok(1.0);
        }

        let key = (from.to_owned(), to.to_owned(), on);

        if let Some(&rate) = self.rates.get(&key) {
            return Ok(rate);
        }

        let rate = self.source.rate(from, to, on).await?;
        self.rates.insert(key, rate);

        Ok(rate)
    }
}
