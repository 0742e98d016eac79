use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::{parse_class, parse_trove_id, AppState, TroveDto};
use crate::domain::TroveId;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassesResponse {
    pub classes: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResponse {
    pub class: String,
    pub trove_count: usize,
    pub total_collateral: String,
    pub total_debt: String,
    pub pool_collateral: String,
    pub pool_debt: String,
    pub ratio: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrovesResponse {
    pub class: String,
    pub troves: Vec<TroveDto>,
}

/// Result of a traversal step; `troveId` is null at either end of the list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorResponse {
    pub trove_id: Option<u64>,
}

impl From<Option<TroveId>> for CursorResponse {
    fn from(id: Option<TroveId>) -> Self {
        Self {
            trove_id: id.map(|id| id.as_u64()),
        }
    }
}

pub async fn list_classes(State(state): State<AppState>) -> Json<ClassesResponse> {
    let classes = state
        .service
        .classes()
        .await
        .into_iter()
        .map(|c| c.as_str().to_string())
        .collect();
    Json(ClassesResponse { classes })
}

pub async fn get_pool(
    Path(class): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PoolResponse>, AppError> {
    let class = parse_class(&class)?;
    let market = state.service.market(&class).await?;

    Ok(Json(PoolResponse {
        class: market.class.as_str().to_string(),
        trove_count: market.trove_count,
        total_collateral: market.total_collateral.to_canonical_string(),
        total_debt: market.total_debt.to_canonical_string(),
        pool_collateral: market.pool.collateral_balance.to_canonical_string(),
        pool_debt: market.pool.debt_balance.to_canonical_string(),
        ratio: market.pool.ratio.to_canonical_string(),
    }))
}

pub async fn list_troves(
    Path(class): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TrovesResponse>, AppError> {
    let class = parse_class(&class)?;
    let troves = state.service.troves(&class).await?;

    Ok(Json(TrovesResponse {
        class: class.as_str().to_string(),
        troves: troves.iter().map(TroveDto::from).collect(),
    }))
}

pub async fn first_trove(
    Path(class): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CursorResponse>, AppError> {
    let class = parse_class(&class)?;
    Ok(Json(state.service.first_trove(&class).await?.into()))
}

pub async fn last_trove(
    Path(class): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CursorResponse>, AppError> {
    let class = parse_class(&class)?;
    Ok(Json(state.service.last_trove(&class).await?.into()))
}

pub async fn next_trove(
    Path((class, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<CursorResponse>, AppError> {
    let class = parse_class(&class)?;
    let id = parse_trove_id(&id)?;
    Ok(Json(state.service.next_trove(&class, id).await?.into()))
}

pub async fn prev_trove(
    Path((class, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<CursorResponse>, AppError> {
    let class = parse_class(&class)?;
    let id = parse_trove_id(&id)?;
    Ok(Json(state.service.prev_trove(&class, id).await?.into()))
}
