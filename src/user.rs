//! Defines the user model, its database queries and the registration
//! endpoint.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error};

/// Alias for the integer type used for user primary keys.
pub type UserId = i64;

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The user's email address, unique across users.
    pub email: String,
    /// The bcrypt hash of the user's password.
    pub password_hash: String,
    /// The currency in which the user's net worth is reported.
    pub primary_currency: String,
}

/// Create the table that stores users.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            primary_currency TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        primary_currency: row.get(3)?,
    })
}

/// Insert a new user.
///
/// # Errors
/// Returns [Error::DuplicateEmail] if the email is already registered.
pub fn insert_user(
    email: &str,
    password_hash: &str,
    primary_currency: &str,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, password_hash, primary_currency) VALUES (?1, ?2, ?3)",
        (email, password_hash, primary_currency),
    )?;

    Ok(User {
        id: connection.last_insert_rowid(),
        email: email.to_owned(),
        password_hash: password_hash.to_owned(),
        primary_currency: primary_currency.to_owned(),
    })
}

/// Retrieve a user by ID.
pub fn get_user_by_id(id: UserId, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, email, password_hash, primary_currency FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row_to_user)?;

    Ok(user)
}

/// Retrieve a user by email address.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, email, password_hash, primary_currency FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email)], map_row_to_user)?;

    Ok(user)
}

/// The request body for registering a user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// The email address to register.
    pub email: String,
    /// The plain-text password, hashed before storage.
    pub password: String,
    /// The currency to report net worth in, e.g. "USD".
    pub primary_currency: String,
}

/// The public view of a user, without the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// The ID of the user.
    pub id: UserId,
    /// The user's email address.
    pub email: String,
    /// The currency in which the user's net worth is reported.
    pub primary_currency: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            primary_currency: user.primary_currency,
        }
    }
}

/// A route handler for registering a new user.
pub async fn register_user_endpoint(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Error> {
    if request.email.trim().is_empty()
        || request.password.is_empty()
        || request.primary_currency.trim().is_empty()
    {
        return Err(Error::MissingRequiredFields);
    }

    let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    let primary_currency = request.primary_currency.trim().to_uppercase();

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = insert_user(
        request.email.trim(),
        &password_hash,
        &primary_currency,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::{create_user_table, get_user_by_email, get_user_by_id, insert_user};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        connection
    }

    #[test]
    fn insert_and_get_user() {
        let connection = get_test_connection();

        let inserted = insert_user("foo@bar.baz", "$2b$fakehash", "USD", &connection).unwrap();

        assert_eq!(get_user_by_id(inserted.id, &connection).unwrap(), inserted);
        assert_eq!(
            get_user_by_email("foo@bar.baz", &connection).unwrap(),
            inserted
        );
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let connection = get_test_connection();
        insert_user("foo@bar.baz", "$2b$fakehash", "USD", &connection).unwrap();

        let result = insert_user("foo@bar.baz", "$2b$otherhash", "EUR", &connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn missing_user_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_user_by_id(42, &connection), Err(Error::NotFound));
    }
}
