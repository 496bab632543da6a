//! The JSON endpoint for listing wealth snapshots.

use axum::{Json, extract::Query, extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::{AppState, Error, auth::UserContext, timestamp::parse_timestamp};

use super::core::{SnapshotQuery, list_snapshots};

const DEFAULT_LIMIT: u32 = 100;

/// Query parameters accepted when listing snapshots.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshotsParams {
    limit: Option<u32>,
    skip: Option<u32>,
    sort_order: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
}

impl ListSnapshotsParams {
    fn into_query(self) -> Result<SnapshotQuery, Error> {
        // Ascending unless explicitly told otherwise.
        let ascending = self.sort_order.as_deref() != Some("desc");

        Ok(SnapshotQuery {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            skip: self.skip.unwrap_or(0),
            ascending,
            from: self.from_date.as_deref().map(parse_timestamp).transpose()?,
            to: self.to_date.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// A route handler listing the caller's wealth snapshots.
pub async fn list_snapshots_endpoint(
    State(state): State<AppState>,
    ctx: UserContext,
    Query(params): Query<ListSnapshotsParams>,
) -> Result<impl IntoResponse, Error> {
    let query = params.into_query()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let snapshots = list_snapshots(ctx.user_id, &query, &connection)?;

    Ok(Json(snapshots))
}
