//! Defines the category model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserId};

/// Alias for the integer type used for category primary keys.
pub type CategoryId = i64;

/// Whether a category classifies income or expenses.
///
/// Transfers carry no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl CategoryKind {
    /// The lowercase name stored in the database and used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }

    /// Parse the lowercase name used in the database and on the wire.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "income" => Some(CategoryKind::Income),
            "expense" => Some(CategoryKind::Expense),
            _ => None,
        }
    }
}

/// A user-defined label for income or expense transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The ID of the user that owns the category.
    pub user_id: UserId,
    /// The display name of the category.
    pub name: String,
    /// Whether the category applies to income or expense transactions.
    #[serde(rename = "type")]
    pub kind: CategoryKind,
}

/// Create the table that stores categories.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_kind: String = row.get(3)?;
    let kind = CategoryKind::parse(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("invalid category kind {raw_kind:?}").into(),
        )
    })?;

    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind,
    })
}

/// Insert a new category for `user_id`.
pub fn create_category(
    user_id: UserId,
    name: &str,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (user_id, name, kind) VALUES (?1, ?2, ?3)",
        (user_id, name, kind.as_str()),
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        user_id,
        name: name.to_owned(),
        kind,
    })
}

/// Retrieve the category `id` owned by `user_id` with kind `kind`.
///
/// The kind must match: an expense transaction cannot reference an income
/// category.
///
/// # Errors
/// Returns [Error::NotFound] if no such category exists.
pub fn get_category(
    id: CategoryId,
    user_id: UserId,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "SELECT id, user_id, name, kind FROM category
             WHERE id = :id AND user_id = :user_id AND kind = :kind",
        )?
        .query_row(
            &[
                (":id", &id as &dyn rusqlite::ToSql),
                (":user_id", &user_id),
                (":kind", &kind.as_str()),
            ],
            map_row_to_category,
        )?;

    Ok(category)
}

/// Retrieve every category owned by `user_id`.
pub fn list_categories(user_id: UserId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind FROM category
             WHERE user_id = :user_id
             ORDER BY id",
        )?
        .query_map(&[(":user_id", &user_id)], map_row_to_category)?
        .map(|maybe_category| maybe_category.map_err(Error::SqlError))
        .collect()
}
