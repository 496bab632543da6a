//! JSON endpoints for creating and listing categories.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::{AppState, Error, auth::UserContext};

use super::core::{CategoryKind, create_category, list_categories};

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    /// The display name of the category.
    pub name: String,
    /// Whether the category is for income or expense transactions.
    #[serde(rename = "type")]
    pub kind: String,
}

/// A route handler for creating a new category.
pub async fn create_category_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, Error> {
    if request.name.trim().is_empty() {
        return Err(Error::MissingRequiredFields);
    }

    let kind = CategoryKind::parse(&request.kind).ok_or(Error::InvalidCategoryKind)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let category = create_category(ctx.user_id, request.name.trim(), kind, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// A route handler listing the caller's categories.
pub async fn list_categories_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
) -> Result<impl IntoResponse, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let categories = list_categories(ctx.user_id, &connection)?;

    Ok(Json(categories))
}
