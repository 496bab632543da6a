//! Defines the transaction model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    user::UserId,
};

/// Alias for the integer type used for transaction primary keys.
pub type TransactionId = i64;

/// The three kinds of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned into an account.
    Income,
    /// Money spent from an account.
    Expense,
    /// Money moved between two of the user's own accounts.
    Transfer,
}

impl TransactionKind {
    /// The lowercase name stored in the database and used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
        }
    }

    /// Parse the lowercase name used in the database and on the wire.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            "transfer" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }
}

/// A posted transaction.
///
/// Converted amounts are fixed at posting time using the exchange rates of
/// the transaction date; they are never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the user that owns the transaction.
    pub user_id: UserId,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// A text description of the transaction.
    pub description: String,
    /// The amount in the source account's currency. Always positive; the
    /// kind determines the sign of its effect.
    pub amount: f64,
    /// The kind of transaction.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The amount converted to the user's primary currency.
    pub converted_source_amount: f64,
    /// For transfers, the destination-side amount expressed in the user's
    /// primary currency.
    pub converted_destination_amount: Option<f64>,
    /// The category, present for income and expenses only.
    pub category_id: Option<CategoryId>,
    /// The account the money left (or arrived in, for income).
    pub source_account_id: AccountId,
    /// The receiving account, present for transfers only.
    pub destination_account_id: Option<AccountId>,
}

/// The fields of a transaction that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// A text description of the transaction.
    pub description: String,
    /// The amount in the source account's currency.
    pub amount: f64,
    /// The kind of transaction.
    pub kind: TransactionKind,
    /// The amount converted to the user's primary currency.
    pub converted_source_amount: f64,
    /// For transfers, the destination-side amount in the primary currency.
    pub converted_destination_amount: Option<f64>,
    /// The category, for income and expenses.
    pub category_id: Option<CategoryId>,
    /// The account the money left (or arrived in, for income).
    pub source_account_id: AccountId,
    /// The receiving account, for transfers.
    pub destination_account_id: Option<AccountId>,
}

/// Create the table that stores transactions.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            kind TEXT NOT NULL,
            converted_source_amount REAL NOT NULL,
            converted_destination_amount REAL,
            category_id INTEGER,
            source_account_id INTEGER NOT NULL,
            destination_account_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id),
            FOREIGN KEY(source_account_id) REFERENCES account(id),
            FOREIGN KEY(destination_account_id) REFERENCES account(id)
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_kind: String = row.get(5)?;
    let kind = TransactionKind::parse(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("invalid transaction kind {raw_kind:?}").into(),
        )
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        kind,
        converted_source_amount: row.get(6)?,
        converted_destination_amount: row.get(7)?,
        category_id: row.get(8)?,
        source_account_id: row.get(9)?,
        destination_account_id: row.get(10)?,
    })
}

/// Insert `new_transaction` for `user_id`.
pub fn insert_transaction(
    user_id: UserId,
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let date = new_transaction.date.to_offset(time::UtcOffset::UTC);

    connection.execute(
        "INSERT INTO \"transaction\" (
            user_id, date, description, amount, kind,
            converted_source_amount, converted_destination_amount,
            category_id, source_account_id, destination_account_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        (
            user_id,
            date,
            &new_transaction.description,
            new_transaction.amount,
            new_transaction.kind.as_str(),
            new_transaction.converted_source_amount,
            new_transaction.converted_destination_amount,
            new_transaction.category_id,
            new_transaction.source_account_id,
            new_transaction.destination_account_id,
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        user_id,
        date,
        description: new_transaction.description.clone(),
        amount: new_transaction.amount,
        kind: new_transaction.kind,
        converted_source_amount: new_transaction.converted_source_amount,
        converted_destination_amount: new_transaction.converted_destination_amount,
        category_id: new_transaction.category_id,
        source_account_id: new_transaction.source_account_id,
        destination_account_id: new_transaction.destination_account_id,
    })
}

/// Filters applied when listing transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only include transactions of these kinds.
    pub kinds: Vec<TransactionKind>,
    /// Only include transactions with one of these categories.
    pub category_ids: Vec<CategoryId>,
    /// Only include transactions drawn from one of these source accounts.
    pub source_account_ids: Vec<AccountId>,
    /// Only include transactions whose description contains this text,
    /// case-insensitively.
    pub search_term: Option<String>,
    /// Only include transactions at or after this instant.
    pub date_from: Option<OffsetDateTime>,
    /// Only include transactions at or before this instant.
    pub date_to: Option<OffsetDateTime>,
}

fn push_id_clause(sql: &mut String, column: &str, count: usize) {
    sql.push_str(" AND ");
    sql.push_str(column);
    sql.push_str(" IN (");
    for i in 0..count {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
    }
    sql.push(')');
}

/// Retrieve transactions for `user_id` matching `filter`, newest first.
pub fn list_transactions(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut sql = String::from(
        "SELECT id, user_id, date, description, amount, kind,
                converted_source_amount, converted_destination_amount,
                category_id, source_account_id, destination_account_id
         FROM \"transaction\"
         WHERE user_id = ?",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

    if !filter.kinds.is_empty() {
        push_id_clause(&mut sql, "kind", filter.kinds.len());
        for kind in &filter.kinds {
            params.push(Box::new(kind.as_str()));
        }
    }

    if !filter.category_ids.is_empty() {
        push_id_clause(&mut sql, "category_id", filter.category_ids.len());
        for id in &filter.category_ids {
            params.push(Box::new(*id));
        }
    }

    if !filter.source_account_ids.is_empty() {
        push_id_clause(&mut sql, "source_account_id", filter.source_account_ids.len());
        for id in &filter.source_account_ids {
            params.push(Box::new(*id));
        }
    }

    if let Some(term) = &filter.search_term {
        sql.push_str(" AND description LIKE ? COLLATE NOCASE");
        params.push(Box::new(format!("%{term}%")));
    }

    if let Some(from) = filter.date_from {
        sql.push_str(" AND date >= ?");
        params.push(Box::new(from.to_offset(time::UtcOffset::UTC)));
    }

    if let Some(to) = filter.date_to {
        sql.push_str(" AND date <= ?");
        params.push(Box::new(to.to_offset(time::UtcOffset::UTC)));
    }

    sql.push_str(" ORDER BY date DESC, id DESC");

    connection
        .prepare(&sql)?
        .query_map(
            rusqlite::params_from_iter(params.iter()),
            map_row_to_transaction,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        account::create_account_table, category::create_category_table, user::create_user_table,
    };

    use super::{
        NewTransaction, TransactionFilter, TransactionKind, create_transaction_table,
        insert_transaction, list_transactions,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        create_account_table(&connection).unwrap();
        create_category_table(&connection).unwrap();
        create_transaction_table(&connection).unwrap();
        connection
            .execute_batch(
                "INSERT INTO user (email, password_hash, primary_currency)
                 VALUES ('a@b.c', 'x', 'USD'), ('d@e.f', 'x', 'EUR');
                 INSERT INTO account (user_id, name, currency, balance)
                 VALUES (1, 'Checking', 'USD', 1000.0);
                 INSERT INTO category (user_id, name, kind)
                 VALUES (1, 'Groceries', 'expense'), (1, 'Salary', 'income');",
            )
            .unwrap();
        connection
    }

    fn expense(
        date: time::OffsetDateTime,
        description: &str,
        amount: f64,
        category_id: i64,
    ) -> NewTransaction {
        NewTransaction {
            date,
            description: description.to_owned(),
            amount,
            kind: TransactionKind::Expense,
            converted_source_amount: amount,
            converted_destination_amount: None,
            category_id: Some(category_id),
            source_account_id: 1,
            destination_account_id: None,
        }
    }

    #[test]
    fn insert_and_list_newest_first() {
        let connection = get_test_connection();
        let older = insert_transaction(
            1,
            &expense(datetime!(2024-01-01 00:00 UTC), "Coffee", 4.5, 1),
            &connection,
        )
        .unwrap();
        let newer = insert_transaction(
            1,
            &expense(datetime!(2024-01-02 00:00 UTC), "Lunch", 12.0, 1),
            &connection,
        )
        .unwrap();

        let transactions =
            list_transactions(1, &TransactionFilter::default(), &connection).unwrap();

        assert_eq!(transactions, vec![newer, older]);
    }

    #[test]
    fn list_is_scoped_to_owner() {
        let connection = get_test_connection();
        insert_transaction(
            2,
            &expense(datetime!(2024-01-01 00:00 UTC), "Coffee", 4.5, 1),
            &connection,
        )
        .unwrap();

        let transactions =
            list_transactions(1, &TransactionFilter::default(), &connection).unwrap();

        assert!(transactions.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let connection = get_test_connection();
        insert_transaction(
            1,
            &expense(datetime!(2024-01-01 00:00 UTC), "Morning Coffee", 4.5, 1),
            &connection,
        )
        .unwrap();
        insert_transaction(
            1,
            &expense(datetime!(2024-01-02 00:00 UTC), "Lunch", 12.0, 1),
            &connection,
        )
        .unwrap();

        let filter = TransactionFilter {
            search_term: Some("coffee".to_owned()),
            ..Default::default()
        };
        let transactions = list_transactions(1, &filter, &connection).unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].description, "Morning Coffee");
    }

    #[test]
    fn filters_combine() {
        let connection = get_test_connection();
        insert_transaction(
            1,
            &expense(datetime!(2024-01-01 00:00 UTC), "Groceries", 80.0, 1),
            &connection,
        )
        .unwrap();
        insert_transaction(
            1,
            &expense(datetime!(2024-02-01 00:00 UTC), "Groceries", 90.0, 2),
            &connection,
        )
        .unwrap();
        insert_transaction(
            1,
            &NewTransaction {
                kind: TransactionKind::Income,
                category_id: Some(2),
                ..expense(datetime!(2024-02-02 00:00 UTC), "Salary", 3000.0, 2)
            },
            &connection,
        )
        .unwrap();

        let filter = TransactionFilter {
            kinds: vec![TransactionKind::Expense],
            category_ids: vec![2],
            date_from: Some(datetime!(2024-01-15 00:00 UTC)),
            ..Default::default()
        };
        let transactions = list_transactions(1, &filter, &connection).unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, 90.0);
    }

    #[test]
    fn date_window_bounds_are_inclusive() {
        let connection = get_test_connection();
        insert_transaction(
            1,
            &expense(datetime!(2024-01-15 00:00 UTC), "Edge", 10.0, 1),
            &connection,
        )
        .unwrap();

        let filter = TransactionFilter {
            date_from: Some(datetime!(2024-01-15 00:00 UTC)),
            date_to: Some(datetime!(2024-01-15 00:00 UTC)),
            ..Default::default()
        };
        let transactions = list_transactions(1, &filter, &connection).unwrap();

        assert_eq!(transactions.len(), 1);
    }
}
