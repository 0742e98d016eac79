pub mod classes;
pub mod events;
pub mod health;
pub mod troves;

use crate::config::{Config, LiquidationMode};
use crate::domain::{CollateralClass, Trove, TroveId};
use crate::engine::{Ledger, LedgerSettings};
use crate::error::AppError;
use crate::orchestration::{FlaggedTroves, LedgerService, LiquidationAuthority, Unrestricted};
use axum::{
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: LedgerService,
    pub flags: Arc<FlaggedTroves>,
    pub config: Config,
}

impl AppState {
    pub fn new(service: LedgerService, flags: Arc<FlaggedTroves>, config: Config) -> Self {
        Self {
            service,
            flags,
            config,
        }
    }

    /// Build the ledger, authority and service described by `config`.
    pub fn from_config(config: Config) -> Self {
        let settings = LedgerSettings {
            seed_collateral: config.seed_collateral,
            seed_debt: config.seed_debt,
        };
        let ledger = Ledger::with_classes(settings, config.collateral_classes.iter().cloned());

        let flags = Arc::new(FlaggedTroves::new());
        let authority: Arc<dyn LiquidationAuthority> = match config.liquidation_mode {
            LiquidationMode::Flagged => flags.clone() as Arc<dyn LiquidationAuthority>,
            LiquidationMode::Unrestricted => Arc::new(Unrestricted),
        };

        let service = LedgerService::new(ledger, authority, config.event_journal_capacity);
        Self::new(service, flags, config)
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/classes", get(classes::list_classes))
        .route("/v1/classes/:class/pool", get(classes::get_pool))
        .route(
            "/v1/classes/:class/troves",
            get(classes::list_troves).post(troves::create_trove),
        )
        .route("/v1/classes/:class/troves/first", get(classes::first_trove))
        .route("/v1/classes/:class/troves/last", get(classes::last_trove))
        .route("/v1/classes/:class/troves/:id/next", get(classes::next_trove))
        .route("/v1/classes/:class/troves/:id/prev", get(classes::prev_trove))
        .route("/v1/troves/:id", get(troves::get_trove))
        .route("/v1/troves/:id/deposit", post(troves::deposit))
        .route("/v1/troves/:id/withdraw", post(troves::withdraw))
        .route("/v1/troves/:id/claim", post(troves::claim))
        .route("/v1/troves/:id/liquidate", post(troves::liquidate))
        .route("/v1/troves/:id/liquidatable", put(troves::set_liquidatable))
        .route("/v1/events", get(events::get_events))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TroveDto {
    pub trove_id: u64,
    pub class: String,
    pub collateral: String,
    pub debt: String,
    pub ratio_snapshot: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unclaimed_collateral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unclaimed_debt: Option<String>,
}

impl From<&Trove> for TroveDto {
    fn from(trove: &Trove) -> Self {
        Self {
            trove_id: trove.id.as_u64(),
            class: trove.class.as_str().to_string(),
            collateral: trove.collateral.to_canonical_string(),
            debt: trove.debt.to_canonical_string(),
            ratio_snapshot: trove.ratio_snapshot.to_canonical_string(),
            unclaimed_collateral: None,
            unclaimed_debt: None,
        }
    }
}

pub(crate) fn parse_class(raw: &str) -> Result<CollateralClass, AppError> {
    CollateralClass::from_str(raw).map_err(|_| AppError::BadRequest("Invalid collateral class".into()))
}

pub(crate) fn parse_trove_id(raw: &str) -> Result<TroveId, AppError> {
    raw.parse::<u64>()
        .map(TroveId::new)
        .map_err(|_| AppError::BadRequest("Invalid trove id".into()))
}
