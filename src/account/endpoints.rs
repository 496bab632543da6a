//! JSON endpoints for creating and listing accounts.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::{AppState, Error, auth::UserContext};

use super::core::{create_account, list_accounts};

/// The request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// The display name of the account.
    pub name: String,
    /// The ISO currency code the balance is expressed in.
    pub currency: String,
    /// The opening balance, defaulting to zero.
    #[serde(default)]
    pub balance: f64,
}

/// A route handler for creating a new account.
pub async fn create_account_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, Error> {
    if request.name.trim().is_empty() || request.currency.trim().is_empty() {
        return Err(Error::MissingRequiredFields);
    }

    let currency = request.currency.trim().to_uppercase();

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let account = create_account(
        ctx.user_id,
        request.name.trim(),
        &currency,
        request.balance,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// A route handler listing the caller's accounts.
pub async fn list_accounts_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let accounts = list_accounts(ctx.user_id, &connection)?;

    Ok(Json(accounts))
}
