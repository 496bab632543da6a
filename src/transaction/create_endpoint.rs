//! Defines the endpoint for creating a new transaction.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    account::{Account, AccountId, get_account},
    auth::UserContext,
    category::{CategoryId, CategoryKind, get_category},
    currency::RateCache,
    timestamp::parse_timestamp,
};

use super::{
    core::{Transaction, TransactionKind},
    posting::{PostingInput, PostingRates, post_transaction},
};

/// The request body for creating a transaction.
///
/// Every field is optional at the parsing stage so that missing fields
/// produce the endpoint's own error messages instead of a generic
/// deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    /// When the transaction happened, RFC 3339 or `YYYY-MM-DD`.
    pub date: Option<String>,
    /// A text description of the transaction.
    pub description: Option<String>,
    /// The amount, accepted as a JSON number or a numeric string.
    pub amount: Option<Value>,
    /// One of `income`, `expense` or `transfer`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// The category, required for income and expenses.
    pub category_id: Option<CategoryId>,
    /// The account the money leaves (or arrives in, for income).
    pub source_account_id: Option<AccountId>,
    /// The receiving account, required for transfers.
    pub destination_account_id: Option<AccountId>,
}

/// The fields of a request that survived validation, before the referenced
/// rows are looked up.
struct ValidatedRequest {
    date: OffsetDateTime,
    description: String,
    amount: f64,
    kind: TransactionKind,
    category_id: Option<CategoryId>,
    source_account_id: AccountId,
    destination_account_id: Option<AccountId>,
}

fn non_blank(field: Option<&String>) -> Option<&str> {
    field.map(|text| text.trim()).filter(|text| !text.is_empty())
}

fn parse_amount(value: Option<&Value>) -> Result<f64, Error> {
    let amount = match value {
        Some(Value::Number(number)) => number.as_f64().ok_or(Error::InvalidAmount)?,
        Some(Value::String(text)) => text.trim().parse().map_err(|_| Error::InvalidAmount)?,
        _ => return Err(Error::InvalidAmount),
    };

    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount);
    }

    Ok(amount)
}

fn validate(request: &CreateTransactionRequest) -> Result<ValidatedRequest, Error> {
    let date_text = non_blank(request.date.as_ref()).ok_or(Error::MissingRequiredFields)?;
    let description = non_blank(request.description.as_ref()).ok_or(Error::MissingRequiredFields)?;
    let kind_text = non_blank(request.kind.as_ref()).ok_or(Error::MissingRequiredFields)?;

    // The kind-specific required fields come before the amount and date
    // checks, so a request broken in several ways reports these first.
    if kind_text == "transfer" {
        if request.destination_account_id.is_none() {
            return Err(Error::MissingDestinationAccount);
        }
        if request.source_account_id.is_none() {
            return Err(Error::MissingRequiredFields);
        }
    } else if (kind_text == "income" || kind_text == "expense")
        && (request.category_id.is_none() || request.source_account_id.is_none())
    {
        return Err(Error::MissingCategoryOrSource);
    }

    let amount = parse_amount(request.amount.as_ref())?;
    let kind = TransactionKind::parse(kind_text).ok_or(Error::InvalidKind)?;
    let date = parse_timestamp(date_text)?;
    let source_account_id = request
        .source_account_id
        .ok_or(Error::MissingRequiredFields)?;

    Ok(ValidatedRequest {
        date,
        description: description.to_owned(),
        amount,
        kind,
        category_id: request.category_id,
        source_account_id,
        destination_account_id: match kind {
            TransactionKind::Transfer => request.destination_account_id,
            _ => None,
        },
    })
}

/// Load the rows a validated request refers to, checking ownership and that
/// the category's kind matches the transaction's.
fn resolve_references(
    ctx: &UserContext,
    validated: &ValidatedRequest,
    state: &AppState,
) -> Result<(Account, Option<Account>), Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    if let Some(category_id) = validated.category_id {
        // Transfers carry no category, and the lookup is kind-matched, so a
        // category supplied with a transfer can never resolve.
        let category_kind = match validated.kind {
            TransactionKind::Income => CategoryKind::Income,
            TransactionKind::Expense => CategoryKind::Expense,
            TransactionKind::Transfer => return Err(Error::InvalidCategory),
        };

        get_category(category_id, ctx.user_id, category_kind, &connection).map_err(|error| {
            match error {
                Error::NotFound => Error::InvalidCategory,
                error => error,
            }
        })?;
    }

    let source = get_account(validated.source_account_id, ctx.user_id, &connection).map_err(
        |error| match error {
            Error::NotFound => Error::InvalidSourceAccount,
            error => error,
        },
    )?;

    let destination = validated
        .destination_account_id
        .map(|id| {
            get_account(id, ctx.user_id, &connection).map_err(|error| match error {
                Error::NotFound => Error::InvalidDestinationAccount,
                error => error,
            })
        })
        .transpose()?;

    Ok((source, destination))
}

async fn handle_create(
    state: &AppState,
    ctx: &UserContext,
    request: CreateTransactionRequest,
) -> Result<Transaction, Error> {
    let validated = validate(&request)?;
    let (source, destination) = resolve_references(ctx, &validated, state)?;

    // Rates are resolved before the database transaction opens so the lock
    // is never held across an await.
    let mut rate_cache = RateCache::new(state.rate_source.clone());
    let rates = PostingRates::resolve(
        &mut rate_cache,
        validated.kind,
        &source,
        destination.as_ref(),
        &ctx.primary_currency,
        validated.date.date(),
    )
    .await?;

    let input = PostingInput {
        date: validated.date,
        description: validated.description,
        amount: validated.amount,
        kind: validated.kind,
        category_id: validated.category_id,
        source,
        destination,
    };

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    post_transaction(ctx, &input, &rates, &connection)
}

/// A route handler for creating a new transaction.
///
/// Posts the transaction atomically: the row, the balance updates and the
/// wealth snapshot all land together or not at all.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(request): Json<CreateTransactionRequest>,
) -> Response {
    match handle_create(&state, &ctx, request).await {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => match error.client_response() {
            Some(_) => error.into_response(),
            None => {
                tracing::error!("could not create transaction: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to create transaction" })),
                )
                    .into_response()
            }
        },
    }
}
