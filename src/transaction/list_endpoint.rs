//! Defines the endpoint for listing transactions grouped by day.
//!
//! Pagination counts days, not rows: a page holds every transaction from a
//! fixed number of calendar days, so a day's activity is never split across
//! pages.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use crate::{AppState, Error, auth::UserContext, timestamp::parse_timestamp};

use super::core::{Transaction, TransactionFilter, TransactionKind, list_transactions};

const DEFAULT_DAYS_PER_PAGE: usize = 5;

/// Query parameters accepted when listing transactions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsParams {
    page: Option<usize>,
    days_per_page: Option<usize>,
    search_term: Option<String>,
    /// Comma-separated transaction kinds.
    #[serde(rename = "type")]
    kind: Option<String>,
    /// Comma-separated category IDs.
    category_id: Option<String>,
    /// Comma-separated source account IDs.
    source_account_id: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

/// One calendar day's transactions.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    /// The day, as `YYYY-MM-DD`.
    pub date: String,
    /// The day's transactions, newest first.
    pub transaction_list: Vec<Transaction>,
}

/// A page of day-grouped transactions.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    /// The days on this page, newest first.
    pub grouped_transactions: Vec<DayGroup>,
    /// The page that was returned.
    pub current_page: usize,
    /// The number of pages available with this page size.
    pub total_pages: usize,
    /// The number of days with at least one matching transaction.
    pub total_days: usize,
    /// The number of days on this page.
    pub days_on_this_page: usize,
}

fn split_ids(field: Option<&String>) -> Vec<i64> {
    field
        .map(|text| {
            text.split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_kinds(field: Option<&String>) -> Result<Vec<TransactionKind>, Error> {
    let Some(text) = field else {
        return Ok(Vec::new());
    };

    text.split(',')
        .map(|part| TransactionKind::parse(part.trim()).ok_or(Error::InvalidKind))
        .collect()
}

impl ListTransactionsParams {
    fn filter(&self) -> Result<TransactionFilter, Error> {
        Ok(TransactionFilter {
            kinds: parse_kinds(self.kind.as_ref())?,
            category_ids: split_ids(self.category_id.as_ref()),
            source_account_ids: split_ids(self.source_account_id.as_ref()),
            search_term: self
                .search_term
                .as_ref()
                .map(|term| term.trim())
                .filter(|term| !term.is_empty())
                .map(str::to_owned),
            date_from: self.date_from.as_deref().map(parse_timestamp).transpose()?,
            date_to: self.date_to.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Group transactions by calendar day, preserving their newest-first order.
fn group_by_day(transactions: Vec<Transaction>) -> Vec<(Date, Vec<Transaction>)> {
    let mut days: Vec<(Date, Vec<Transaction>)> = Vec::new();

    for transaction in transactions {
        let day = transaction.date.date();
        match days.last_mut() {
            Some((current, list)) if *current == day => list.push(transaction),
            _ => days.push((day, vec![transaction])),
        }
    }

    days
}

fn paginate(
    days: Vec<(Date, Vec<Transaction>)>,
    page: usize,
    days_per_page: usize,
) -> TransactionListResponse {
    let total_days = days.len();
    let total_pages = total_days.div_ceil(days_per_page);

    let grouped_transactions: Vec<DayGroup> = days
        .into_iter()
        .skip((page - 1) * days_per_page)
        .take(days_per_page)
        .map(|(date, transaction_list)| DayGroup {
            date: date.to_string(),
            transaction_list,
        })
        .collect();

    TransactionListResponse {
        days_on_this_page: grouped_transactions.len(),
        grouped_transactions,
        current_page: page,
        total_pages,
        total_days,
    }
}

async fn handle_list(
    state: &AppState,
    ctx: &UserContext,
    params: ListTransactionsParams,
) -> Result<TransactionListResponse, Error> {
    let filter = params.filter()?;
    let page = params.page.unwrap_or(1).max(1);
    let days_per_page = params.days_per_page.unwrap_or(DEFAULT_DAYS_PER_PAGE).max(1);

    let transactions = {
        let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
        list_transactions(ctx.user_id, &filter, &connection)?
    };

    Ok(paginate(group_by_day(transactions), page, days_per_page))
}

/// A route handler listing the caller's transactions, grouped by day.
pub async fn list_transactions_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
    Query(params): Query<ListTransactionsParams>,
) -> Response {
    match handle_list(&state, &ctx, params).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => match error.client_response() {
            Some(_) => error.into_response(),
            None => {
                tracing::error!("could not fetch transactions: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to fetch transactions" })),
                )
                    .into_response()
            }
        },
    }
}
