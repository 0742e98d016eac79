use crate::api::AppState;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the ledger answers; reports the classes it serves and how liquidations are gated.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let classes = state.service.classes().await;
    Json(serde_json::json!({
        "status": "ready",
        "collateralClasses": classes.len(),
        "liquidationMode": state.config.liquidation_mode.as_str(),
    }))
}
