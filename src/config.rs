use crate::domain::{Amount, CollateralClass, Fixed};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub collateral_classes: Vec<CollateralClass>,
    pub seed_collateral: Amount,
    pub seed_debt: Amount,
    pub liquidation_mode: LiquidationMode,
    pub event_journal_capacity: usize,
}

/// Where the liquidation signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationMode {
    /// Only troves flagged through the API by the collateralization service.
    Flagged,
    /// Any live trove.
    Unrestricted,
}

impl LiquidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidationMode::Flagged => "flagged",
            LiquidationMode::Unrestricted => "unrestricted",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let collateral_classes = parse_collateral_classes_from_map(&env_map)?;
        let seed_collateral = parse_amount(&env_map, "SEED_COLLATERAL")?;
        let seed_debt = parse_amount(&env_map, "SEED_DEBT")?;

        let liquidation_mode = match env_map
            .get("LIQUIDATION_MODE")
            .map(|s| s.as_str())
            .unwrap_or("flagged")
        {
            "flagged" => LiquidationMode::Flagged,
            "unrestricted" => LiquidationMode::Unrestricted,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LIQUIDATION_MODE".to_string(),
                    format!("must be flagged or unrestricted, got {}", other),
                ))
            }
        };

        let event_journal_capacity = env_map
            .get("EVENT_JOURNAL_CAPACITY")
            .map(|s| s.as_str())
            .unwrap_or("10000")
            .parse::<usize>()
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "EVENT_JOURNAL_CAPACITY".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            collateral_classes,
            seed_collateral,
            seed_debt,
            liquidation_mode,
            event_journal_capacity,
        })
    }
}

fn parse_amount(env_map: &HashMap<String, String>, key: &str) -> Result<Amount, ConfigError> {
    match env_map.get(key) {
        Some(raw) => Fixed::from_str_canonical(raw)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(Fixed::ZERO),
    }
}

fn parse_collateral_classes_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<CollateralClass>, ConfigError> {
    let (key, entries): (&str, Vec<String>) =
        if let Some(classes_str) = env_map.get("COLLATERAL_CLASSES") {
            (
                "COLLATERAL_CLASSES",
                classes_str.split(',').map(|s| s.to_string()).collect(),
            )
        } else if let Some(file_path) = env_map.get("COLLATERAL_CLASSES_FILE") {
            let content = std::fs::read_to_string(file_path).map_err(|_| {
                ConfigError::InvalidValue(
                    "COLLATERAL_CLASSES_FILE".to_string(),
                    "file not found or unreadable".to_string(),
                )
            })?;
            (
                "COLLATERAL_CLASSES_FILE",
                content.lines().map(|s| s.to_string()).collect(),
            )
        } else {
            return Err(ConfigError::MissingEnv("COLLATERAL_CLASSES".to_string()));
        };

    let mut classes: Vec<CollateralClass> = Vec::new();
    for entry in entries.iter().filter(|s| !s.trim().is_empty()) {
        let class = CollateralClass::from_str(entry)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))?;
        if !classes.contains(&class) {
            classes.push(class);
        }
    }

    if classes.is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "at least one collateral class is required".to_string(),
        ));
    }
    Ok(classes)
}
