//! Defines the state shared between route handlers.

use std::sync::{Arc, Mutex};

use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    currency::{RateSource, SqliteRateSource},
    db,
};

/// The state shared between all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The key for encrypting and decrypting private cookies.
    pub cookie_key: Key,
    /// The connection to the application's database.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where exchange rates come from when posting transactions.
    pub rate_source: Arc<dyn RateSource>,
}

impl AppState {
    /// Create the shared state, initializing the database schema.
    ///
    /// Rates are served from the `exchange_rate` table in the same database.
    pub fn new(db_connection: Connection, cookie_secret: &str) -> Result<Self, Error> {
        db::initialize(&db_connection)?;
        let db_connection = Arc::new(Mutex::new(db_connection));
        let rate_source = Arc::new(SqliteRateSource::new(db_connection.clone()));

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            db_connection,
            rate_source,
        })
    }
}

/// Stretch a secret string into a cookie signing/encryption key.
fn create_cookie_key(secret: &str) -> Key {
    let mut hasher = Sha512::new();
    hasher.update(secret.as_bytes());
    let hash = hasher.finalize();

    Key::from(&hash)
}
