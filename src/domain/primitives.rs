//! Domain primitives: TroveId, CollateralClass.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Stable identity of a trove. Assigned once, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TroveId(pub u64);

impl TroveId {
    pub fn new(id: u64) -> Self {
        TroveId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TroveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collateral class (token symbol), e.g. "WETH". Each class has its own registry and pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollateralClass(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid collateral class: {0:?}")]
pub struct CollateralClassParseError(pub String);

impl CollateralClass {
    /// Create a class without validation.
    pub fn new(class: impl Into<String>) -> Self {
        CollateralClass(class.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CollateralClass {
    type Err = CollateralClassParseError;

    /// Accepts ASCII letters, digits, `-`, `_` and `.`; surrounding whitespace is trimmed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(CollateralClass(trimmed.to_string()))
        } else {
            Err(CollateralClassParseError(s.to_string()))
        }
    }
}

impl std::fmt::Display for CollateralClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
