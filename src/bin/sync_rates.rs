//! Fetches the latest exchange rates for a set of currency pairs and stores
//! them in the application database, keyed by today's date.
//!
//! Intended to run on a schedule, e.g. a daily cron job:
//!
//! ```text
//! sync_rates --db-path app.db --pairs USD:EUR,USD:GBP
//! ```

use clap::Parser;
use rusqlite::Connection;
use time::OffsetDateTime;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use buddyledger::currency::{YahooRateSource, create_exchange_rate_table, upsert_rate};

/// Fetch and store the latest exchange rates.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Currency pairs to sync, e.g. USD:EUR.
    #[arg(long, value_delimiter = ',', required = true)]
    pairs: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter::LevelFilter::INFO))
        .init();

    let args = Args::parse();

    let connection = Connection::open(&args.db_path).expect("Could not open the database");
    create_exchange_rate_table(&connection).expect("Could not create the exchange rate table");

    let source = YahooRateSource::new().expect("Could not create the HTTP client");
    let today = OffsetDateTime::now_utc().date();
    let mut failures = 0;

    for pair in &args.pairs {
        let Some((from, to)) = pair.split_once(':') else {
            tracing::error!("Invalid pair {pair:?}, expected FROM:TO");
            failures += 1;
            continue;
        };
        let (from, to) = (from.trim().to_uppercase(), to.trim().to_uppercase());

        match source.fetch_rate(&from, &to).await {
            Ok(rate) => {
                if let Err(error) = upsert_rate(&from, &to, today, rate, &connection) {
                    tracing::error!("Could not store rate for {from}->{to}: {error}");
                    failures += 1;
                    continue;
                }
                tracing::info!("{from}->{to} = {rate} ({today})");
            }
            Err(error) => {
                tracing::error!("Could not fetch rate for {from}->{to}: {error}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
