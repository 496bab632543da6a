//! Exchange rate lookup: rate sources and the per-request rate cache.

mod cache;
mod source;
mod yahoo;

pub use cache::RateCache;
pub use source::{RateSource, SqliteRateSource, create_exchange_rate_table, upsert_rate};
pub use yahoo::YahooRateSource;
