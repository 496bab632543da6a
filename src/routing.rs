//! Application router configuration.
//!
//! Authentication is enforced by the [UserContext](crate::auth::UserContext)
//! extractor on the protected handlers rather than by a middleware guard:
//! a missing or invalid session cookie rejects the request with a 401 before
//! the handler body runs.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState,
    account::{create_account_endpoint, list_accounts_endpoint},
    auth::log_in_endpoint,
    category::{create_category_endpoint, list_categories_endpoint},
    endpoints,
    logging::logging_middleware,
    snapshot::list_snapshots_endpoint,
    transaction::{create_transaction_endpoint, list_transactions_endpoint},
    user::register_user_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let open_routes = Router::new()
        .route(endpoints::USERS, post(register_user_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::WEALTH_SNAPSHOTS, get(list_snapshots_endpoint));

    protected_routes
        .merge(open_routes)
        .layer(middleware::from_fn(logging_middleware))
        .fallback(get_not_found)
        .with_state(state)
}

async fn get_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
        .into_response()
}
