//! Defines the app level error type and its conversion to JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::account::AccountId;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body is missing one of the always-required fields
    /// (date, description or type).
    #[error("Missing required fields")]
    MissingRequiredFields,

    /// A transfer was submitted without a destination account.
    #[error("Destination account is required for transfer type")]
    MissingDestinationAccount,

    /// An income or expense was submitted without a category or source
    /// account.
    #[error("Category and source account are required for expense or income type")]
    MissingCategoryOrSource,

    /// The amount was missing, not a number, or not strictly positive.
    #[error("Amount must be a positive number")]
    InvalidAmount,

    /// The transaction type was not one of income, expense or transfer.
    #[error("Invalid transaction type")]
    InvalidKind,

    /// The date string could not be parsed.
    #[error("Invalid date")]
    InvalidDate,

    /// The category ID did not resolve to a category owned by the user with
    /// a kind matching the transaction.
    #[error("Invalid category")]
    InvalidCategory,

    /// The source account ID did not resolve to an account owned by the user.
    #[error("Invalid source account")]
    InvalidSourceAccount,

    /// The destination account ID did not resolve to an account owned by the
    /// user.
    #[error("Invalid destination account")]
    InvalidDestinationAccount,

    /// The category kind was not one of income or expense.
    #[error("Invalid category type")]
    InvalidCategoryKind,

    /// An account row carries a blank currency code.
    ///
    /// The legacy implementation silently treated this as a 1:1 exchange
    /// rate, corrupting snapshot totals. It is surfaced as an error instead.
    #[error("account {0} has no currency code")]
    MissingCurrency(AccountId),

    /// A back-dated transaction found no snapshot later than its date to
    /// reconstruct from. The snapshot ledger is corrupted; nothing is
    /// written.
    #[error("no snapshot found after a back-dated transaction")]
    MissingNextSnapshot,

    /// No exchange rate is stored for the currency pair.
    #[error("no exchange rate available for {from}->{to}")]
    RateUnavailable {
        /// The currency converted from.
        from: String,
        /// The currency converted to.
        to: String,
    },

    /// The external rate source could not be reached or returned garbage.
    #[error("could not fetch exchange rate: {0}")]
    RateFetch(String),

    /// The email address is already registered.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The email/password combination did not match a user.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The request carries no valid session cookie.
    #[error("Unauthorized")]
    Unauthorized,

    /// The requested resource could not be found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unexpected error occurred with the password hashing library.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An error occurred while serializing or deserializing JSON stored in
    /// the database.
    #[error("could not convert to or from JSON: {0}")]
    JsonError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status and message for errors that are the client's fault.
    ///
    /// Returns `None` for server-side errors, whose details must not leak to
    /// the client.
    pub fn client_response(&self) -> Option<(StatusCode, &str)> {
        match self {
            Error::MissingRequiredFields
            | Error::MissingDestinationAccount
            | Error::MissingCategoryOrSource
            | Error::InvalidAmount
            | Error::InvalidKind
            | Error::InvalidDate
            | Error::InvalidCategory
            | Error::InvalidSourceAccount
            | Error::InvalidDestinationAccount
            | Error::InvalidCategoryKind
            | Error::DuplicateEmail => Some((StatusCode::BAD_REQUEST, self.message())),
            Error::InvalidCredentials | Error::Unauthorized => {
                Some((StatusCode::UNAUTHORIZED, self.message()))
            }
            Error::NotFound => Some((StatusCode::NOT_FOUND, self.message())),
            _ => None,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Error::MissingRequiredFields => "Missing required fields",
            Error::MissingDestinationAccount => {
                "Destination account is required for transfer type"
            }
            Error::MissingCategoryOrSource => {
                "Category and source account are required for expense or income type"
            }
            Error::InvalidAmount => "Amount must be a positive number",
            Error::InvalidKind => "Invalid transaction type",
            Error::InvalidDate => "Invalid date",
            Error::InvalidCategory => "Invalid category",
            Error::InvalidSourceAccount => "Invalid source account",
            Error::InvalidDestinationAccount => "Invalid destination account",
            Error::InvalidCategoryKind => "Invalid category type",
            Error::DuplicateEmail => "Email already registered",
            Error::InvalidCredentials => "Invalid credentials",
            Error::Unauthorized => "Unauthorized",
            Error::NotFound => "Not found",
            _ => "Internal server error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.client_response() {
            Some((status, message)) => (status, Json(json!({ "error": message }))).into_response(),
            // Server-side errors are not intended to be shown to the client.
            None => {
                tracing::error!("An unexpected error occurred: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
