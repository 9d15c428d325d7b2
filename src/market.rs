//! Shared market domain types

use serde::{Deserialize, Serialize};

/// Volatility classification driving fee and price-step assumptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl VolatilityTier {
    /// Parse a tier label. Unknown labels resolve to `Medium` so that
    /// an unrecognized tier can never leave a market without fee rates.
    pub fn parse(label: &str) -> Self {
        match label {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for VolatilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Provenance of a price: live market data or the fallback simulator.
/// Carried on every update and outcome so consumers can never conflate
/// the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Real,
    Simulated,
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// A scored market, supplied by the external market-scoring collaborator.
/// Immutable for the lifetime of any trade opened against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Market identifier (condition id on Polymarket)
    pub id: String,

    /// Question text
    pub question: String,

    /// Current YES price, in (0, 1)
    pub yes_price: f64,

    /// Volatility tier
    pub tier: VolatilityTier,

    /// Predictor confidence that YES wins, 0-100
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse_defaults_to_medium() {
        assert_eq!(VolatilityTier::parse("low"), VolatilityTier::Low);
        assert_eq!(VolatilityTier::parse("high"), VolatilityTier::High);
        assert_eq!(VolatilityTier::parse("medium"), VolatilityTier::Medium);
        assert_eq!(VolatilityTier::parse("extreme"), VolatilityTier::Medium);
        assert_eq!(VolatilityTier::parse(""), VolatilityTier::Medium);
    }
}
