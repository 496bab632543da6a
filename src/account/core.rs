//! Defines the account model and its database queries.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, user::UserId};

/// Alias for the integer type used for account primary keys.
pub type AccountId = i64;

/// A liquid account (checking, savings, cash) holding money in one currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The ID of the user that owns the account.
    pub user_id: UserId,
    /// The display name of the account.
    pub name: String,
    /// The ISO currency code the balance is expressed in, e.g. "USD".
    pub currency: String,
    /// The current balance in the account's own currency.
    ///
    /// Mutated only by transaction posting, inside the posting transaction.
    pub balance: f64,
}

/// Create the table that stores accounts.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            currency TEXT NOT NULL,
            balance REAL NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        currency: row.get(3)?,
        balance: row.get(4)?,
    })
}

/// Insert a new account for `user_id`.
pub fn create_account(
    user_id: UserId,
    name: &str,
    currency: &str,
    balance: f64,
    connection: &Connection,
) -> Result<Account, Error> {
    connection.execute(
        "INSERT INTO account (user_id, name, currency, balance) VALUES (?1, ?2, ?3, ?4)",
        (user_id, name, currency, balance),
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id,
        name: name.to_owned(),
        currency: currency.to_owned(),
        balance,
    })
}

/// Retrieve the account `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if no such account exists for that user.
pub fn get_account(
    id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, user_id, name, currency, balance FROM account
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &user_id)],
            map_row_to_account,
        )?;

    Ok(account)
}

/// Retrieve every account owned by `user_id`.
pub fn list_accounts(user_id: UserId, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, currency, balance FROM account
             WHERE user_id = :user_id
             ORDER BY id",
        )?
        .query_map(&[(":user_id", &user_id)], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::SqlError))
        .collect()
}

/// Apply a signed delta, in the account's own currency, to a stored balance.
///
/// Called only from transaction posting, inside its SQLite transaction, so
/// the balance change commits or rolls back together with the transaction
/// row and the snapshot.
pub fn apply_balance_delta(
    id: AccountId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE account SET balance = balance + ?1 WHERE id = ?2",
        (delta, id),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
