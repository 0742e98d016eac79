use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_class, parse_trove_id, AppState, TroveDto};
use crate::domain::{Amount, Fixed};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidatableRequest {
    pub liquidatable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub claimed_collateral: String,
    pub claimed_debt: String,
    pub trove: TroveDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationResponse {
    pub trove_id: u64,
    pub liquidated_collateral: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidatableResponse {
    pub trove_id: u64,
    pub liquidatable: bool,
}

fn parse_amount(raw: &str) -> Result<Amount, AppError> {
    Fixed::from_str_canonical(raw).map_err(|e| AppError::BadRequest(format!("Invalid amount: {}", e)))
}

pub async fn create_trove(
    Path(class): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TroveDto>), AppError> {
    let class = parse_class(&class)?;
    let trove = state.service.create_trove(&class).await?;
    Ok((StatusCode::CREATED, Json(TroveDto::from(&trove))))
}

pub async fn get_trove(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TroveDto>, AppError> {
    let id = parse_trove_id(&id)?;
    let view = state.service.trove(id).await?;

    let mut dto = TroveDto::from(&view.trove);
    dto.unclaimed_collateral = Some(view.pending.collateral.to_canonical_string());
    dto.unclaimed_debt = Some(view.pending.debt.to_canonical_string());
    Ok(Json(dto))
}

pub async fn deposit(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<AmountRequest>,
) -> Result<Json<TroveDto>, AppError> {
    let id = parse_trove_id(&id)?;
    let amount = parse_amount(&body.amount)?;
    let trove = state.service.deposit(id, amount).await?;
    Ok(Json(TroveDto::from(&trove)))
}

pub async fn withdraw(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<AmountRequest>,
) -> Result<Json<TroveDto>, AppError> {
    let id = parse_trove_id(&id)?;
    let amount = parse_amount(&body.amount)?;
    let trove = state.service.withdraw(id, amount).await?;
    Ok(Json(TroveDto::from(&trove)))
}

pub async fn claim(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClaimResponse>, AppError> {
    let id = parse_trove_id(&id)?;
    let (claimed, trove) = state.service.claim(id).await?;
    Ok(Json(ClaimResponse {
        claimed_collateral: claimed.collateral.to_canonical_string(),
        claimed_debt: claimed.debt.to_canonical_string(),
        trove: TroveDto::from(&trove),
    }))
}

pub async fn liquidate(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LiquidationResponse>, AppError> {
    let id = parse_trove_id(&id)?;
    let collateral = state.service.liquidate(id).await?;
    Ok(Json(LiquidationResponse {
        trove_id: id.as_u64(),
        liquidated_collateral: collateral.to_canonical_string(),
    }))
}

/// Record the external collateralization verdict for a live trove.
pub async fn set_liquidatable(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<LiquidatableRequest>,
) -> Result<Json<LiquidatableResponse>, AppError> {
    let id = parse_trove_id(&id)?;
    state
        .service
        .set_liquidatable(&state.flags, id, body.liquidatable)
        .await?;
    Ok(Json(LiquidatableResponse {
        trove_id: id.as_u64(),
        liquidatable: body.liquidatable,
    }))
}
