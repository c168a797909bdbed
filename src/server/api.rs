//! Request/response endpoints backed by the durable store

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::state::AppState;
use crate::error::Result;
use crate::store::LOG_COLLECTION;
use crate::types::EventRecord;

/// Upper bound on `GET /logs?limit=`
pub const MAX_LOGS_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// GET /logs — most recent persisted records, oldest first
pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<EventRecord>>> {
    let limit = query
        .limit
        .unwrap_or(state.config.history_limit)
        .min(MAX_LOGS_LIMIT);
    let records = state.logs.recent(limit).await?;
    Ok(Json(records))
}

/// GET /health — read-only store check plus live subscriber count
///
/// A store outage is reported as `"db": false`, not as an error.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let db = match state.logs.inner().query(LOG_COLLECTION, &Map::new(), 1).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health query failed");
            false
        }
    };

    Json(json!({
        "status": "ok",
        "db": db,
        "subscribers": state.registry.len(),
    }))
}
