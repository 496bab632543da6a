//! Defines the wealth snapshot model and its database queries.
//!
//! Snapshots are stored one row per record. The per-account breakdown is a
//! JSON array in the `liquidity_accounts` column, matching the wire shape.
//! Timestamps are stored as RFC 3339 text in UTC, so string comparison in
//! SQL agrees with chronological order.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, user::UserId};

use super::ledger::{LiquidityEntry, SnapshotState};

/// Alias for the integer type used for snapshot primary keys.
pub type SnapshotId = i64;

/// A point-in-time record of a user's net worth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthSnapshot {
    /// The ID of the snapshot.
    pub id: SnapshotId,
    /// The ID of the user the snapshot belongs to.
    pub user_id: UserId,
    /// The instant the snapshot describes.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Net worth in the user's primary currency.
    pub total_value: f64,
    /// The per-account breakdown.
    pub liquidity_accounts: Vec<LiquidityEntry>,
}

impl WealthSnapshot {
    /// The value part of the snapshot, detached from its identity.
    pub fn state(&self) -> SnapshotState {
        SnapshotState {
            total_value: self.total_value,
            entries: self.liquidity_accounts.clone(),
        }
    }
}

/// Create the table that stores wealth snapshots.
pub fn create_wealth_snapshot_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS wealth_snapshot (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            total_value REAL NOT NULL,
            liquidity_accounts TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_snapshot(row: &Row) -> Result<WealthSnapshot, rusqlite::Error> {
    let raw_entries: String = row.get(4)?;
    let liquidity_accounts = serde_json::from_str(&raw_entries).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })?;

    Ok(WealthSnapshot {
        id: row.get(0)?,
        user_id: row.get(1)?,
        timestamp: row.get(2)?,
        total_value: row.get(3)?,
        liquidity_accounts,
    })
}

/// Insert a snapshot of `state` at `timestamp` for `user_id`.
pub fn insert_snapshot(
    user_id: UserId,
    timestamp: OffsetDateTime,
    state: &SnapshotState,
    connection: &Connection,
) -> Result<WealthSnapshot, Error> {
    let timestamp = timestamp.to_offset(time::UtcOffset::UTC);
    let liquidity_accounts = serde_json::to_string(&state.entries)
        .map_err(|error| Error::JsonError(error.to_string()))?;

    connection.execute(
        "INSERT INTO wealth_snapshot (user_id, timestamp, total_value, liquidity_accounts)
         VALUES (?1, ?2, ?3, ?4)",
        (user_id, timestamp, state.total_value, &liquidity_accounts),
    )?;

    Ok(WealthSnapshot {
        id: connection.last_insert_rowid(),
        user_id,
        timestamp,
        total_value: state.total_value,
        liquidity_accounts: state.entries.clone(),
    })
}

/// Retrieve the most recent snapshot for `user_id`, if any exists.
pub fn latest_snapshot(
    user_id: UserId,
    connection: &Connection,
) -> Result<Option<WealthSnapshot>, Error> {
    let result = connection
        .prepare(
            "SELECT id, user_id, timestamp, total_value, liquidity_accounts
             FROM wealth_snapshot
             WHERE user_id = :user_id
             ORDER BY timestamp DESC, id DESC
             LIMIT 1",
        )?
        .query_row(&[(":user_id", &user_id)], map_row_to_snapshot);

    match result {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Retrieve the earliest snapshot strictly after `timestamp` for `user_id`.
///
/// This is the reconstruction anchor for back-dated transactions.
pub fn next_snapshot_after(
    user_id: UserId,
    timestamp: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<WealthSnapshot>, Error> {
    let timestamp = timestamp.to_offset(time::UtcOffset::UTC);
    let result = connection
        .prepare(
            "SELECT id, user_id, timestamp, total_value, liquidity_accounts
             FROM wealth_snapshot
             WHERE user_id = :user_id AND timestamp > :timestamp
             ORDER BY timestamp ASC, id ASC
             LIMIT 1",
        )?
        .query_row(
            &[
                (":user_id", &user_id as &dyn rusqlite::ToSql),
                (":timestamp", &timestamp),
            ],
            map_row_to_snapshot,
        );

    match result {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Filters and paging for listing snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotQuery {
    /// The maximum number of snapshots to return.
    pub limit: u32,
    /// The number of snapshots to skip over before returning any.
    pub skip: u32,
    /// Whether to order by timestamp ascending rather than descending.
    pub ascending: bool,
    /// Only include snapshots at or after this instant.
    pub from: Option<OffsetDateTime>,
    /// Only include snapshots at or before this instant.
    pub to: Option<OffsetDateTime>,
}

impl Default for SnapshotQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            skip: 0,
            ascending: true,
            from: None,
            to: None,
        }
    }
}

/// Retrieve snapshots for `user_id` matching `query`.
pub fn list_snapshots(
    user_id: UserId,
    query: &SnapshotQuery,
    connection: &Connection,
) -> Result<Vec<WealthSnapshot>, Error> {
    let mut sql = String::from(
        "SELECT id, user_id, timestamp, total_value, liquidity_accounts
         FROM wealth_snapshot
         WHERE user_id = ?",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

    if let Some(from) = query.from {
        sql.push_str(" AND timestamp >= ?");
        params.push(Box::new(from.to_offset(time::UtcOffset::UTC)));
    }

    if let Some(to) = query.to {
        sql.push_str(" AND timestamp <= ?");
        params.push(Box::new(to.to_offset(time::UtcOffset::UTC)));
    }

    if query.ascending {
        sql.push_str(" ORDER BY timestamp ASC, id ASC");
    } else {
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    params.push(Box::new(query.limit));
    params.push(Box::new(query.skip));

    connection
        .prepare(&sql)?
        .query_map(rusqlite::params_from_iter(params.iter()), map_row_to_snapshot)?
        .map(|maybe_snapshot| maybe_snapshot.map_err(Error::SqlError))
        .collect()
}
