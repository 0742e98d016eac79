use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::engine::LedgerEvent;

const DEFAULT_LIMIT: usize = 500;
const MAX_LIMIT: usize = 5000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub since: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<LedgerEvent>,
    /// Oldest sequence number still retained; a cursor below `oldestSeq - 1` has missed events.
    pub oldest_seq: Option<u64>,
    pub latest_seq: Option<u64>,
}

pub async fn get_events(
    Query(params): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Json<EventsResponse> {
    let since = params.since.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let page = state.service.events_since(since, limit).await;

    Json(EventsResponse {
        events: page.events,
        oldest_seq: page.oldest_seq,
        latest_seq: page.latest_seq,
    })
}
