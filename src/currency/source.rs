//! Defines the rate source trait and the SQLite backed implementation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use time::Date;

use crate::Error;

/// Supplies an exchange rate between two currencies as of a date.
///
/// The request path never calls an implementation directly; lookups go
/// through a [RateCache](crate::currency::RateCache) so each pair is resolved
/// at most once per request.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// The multiplier converting an amount in `from` to an amount in `to`,
    /// as of the day `on`.
    async fn rate(&self, from: &str, to: &str, on: Date) -> Result<f64, Error>;
}

/// Looks up exchange rates stored in the `exchange_rate` table.
///
/// Rates are keyed by currency pair and day. A lookup takes the most recent
/// stored rate at or before the requested day, falling back to the inverse
/// pair when the direct pair is absent.
#[derive(Clone)]
pub struct SqliteRateSource {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRateSource {
    /// Create a rate source reading from the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RateSource for SqliteRateSource {
    async fn rate(&self, from: &str, to: &str, on: Date) -> Result<f64, Error> {
        let connection = self.connection.lock().map_err(|_| Error::DatabaseLock)?;

        if let Some(rate) = select_rate(from, to, on, &connection)? {
            return Ok(rate);
        }

        // No direct quote: derive from the inverse pair.
        if let Some(inverse) = select_rate(to, from, on, &connection)? {
            if inverse != 0.0 {
                return Ok(1.0 / inverse);
            }
        }

        Err(Error::RateUnavailable {
            from: from.to_owned(),
            to: to.to_owned(),
        })
    }
}

fn select_rate(
    from: &str,
    to: &str,
    on: Date,
    connection: &Connection,
) -> Result<Option<f64>, Error> {
    let rate = connection
        .prepare(
            "SELECT rate FROM exchange_rate
             WHERE from_currency = ?1 AND to_currency = ?2 AND day <= ?3
             ORDER BY day DESC
             LIMIT 1",
        )?
        .query_row((from, to, on), |row| row.get(0));

    match rate {
        Ok(rate) => Ok(Some(rate)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Create the table that stores exchange rates.
pub fn create_exchange_rate_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS exchange_rate (
            id INTEGER PRIMARY KEY,
            from_currency TEXT NOT NULL,
            to_currency TEXT NOT NULL,
            day TEXT NOT NULL,
            rate REAL NOT NULL,
            UNIQUE(from_currency, to_currency, day)
        )",
        (),
    )?;

    Ok(())
}

/// Insert or overwrite the stored rate for a currency pair on a day.
pub fn upsert_rate(
    from: &str,
    to: &str,
    day: Date,
    rate: f64,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO exchange_rate (from_currency, to_currency, day, rate)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(from_currency, to_currency, day) DO UPDATE SET rate = excluded.rate",
        (from, to, day, rate),
    )?;

    Ok(())
}
