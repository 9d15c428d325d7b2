//! Pre-trade economic gate
//!
//! Combines the fee model with a confidence-weighted expected value and
//! rejects entries whose edge does not clear fees with room to spare.
//! Checks accumulate reasons instead of short-circuiting so the caller
//! can surface the full diagnostic.

use serde::{Deserialize, Serialize};

use crate::config::TradingConfig;
use crate::fees::FeeModel;
use crate::market::{Market, VolatilityTier};

/// Outcome of validating a prospective entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryValidation {
    pub valid: bool,
    pub reasons: Vec<String>,
    pub expected_profit: f64,
    pub fee_cost: f64,
    pub edge_after_fees: f64,
    pub break_even_profit: f64,
    /// Break-even as a fraction of stake
    pub min_profit_required: f64,
}

/// Gate a prospective entry on expected value after fees.
///
/// Expected profit weighs the configured take-profit and stop-loss
/// targets by the predictor's win probability. Fees are taken at the
/// winning rate since that is the cost of the outcome being bet on.
pub fn validate_entry(
    market: &Market,
    confidence: f64,
    stake: f64,
    tier: VolatilityTier,
    trading: &TradingConfig,
    fee_model: &FeeModel,
) -> EntryValidation {
    let fees = fee_model.compute_fees(stake, tier, true);
    let break_even_profit = fee_model.break_even_profit(stake, tier);

    let win_probability = confidence / 100.0;
    let potential_win = stake * trading.take_profit_pct;
    let potential_loss = stake * trading.stop_loss_pct;
    let expected_profit =
        win_probability * potential_win - (1.0 - win_probability) * potential_loss;
    let edge_after_fees = expected_profit - fees.total;

    let mut reasons = Vec::new();

    let min_expected = stake * trading.min_expected_profit_pct;
    if expected_profit < min_expected {
        reasons.push(format!(
            "expected profit (${expected_profit:.2}) below minimum (${min_expected:.2})"
        ));
    }

    let min_edge = stake * trading.min_edge_over_fees_pct;
    if edge_after_fees < min_edge {
        reasons.push(format!(
            "edge after fees (${edge_after_fees:.2}) below minimum (${min_edge:.2})"
        ));
    }

    if confidence < trading.min_confidence {
        reasons.push(format!(
            "confidence ({confidence:.0}%) below threshold ({:.0}%) for \"{}\"",
            trading.min_confidence, market.question
        ));
    }

    EntryValidation {
        valid: reasons.is_empty(),
        reasons,
        expected_profit,
        fee_cost: fees.total,
        edge_after_fees,
        break_even_profit,
        min_profit_required: if stake > 0.0 {
            break_even_profit / stake
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeeConfig;

    fn market(confidence: f64) -> Market {
        Market {
            id: "0xabc".to_string(),
            question: "Will it rain tomorrow?".to_string(),
            yes_price: 0.5,
            tier: VolatilityTier::Medium,
            confidence,
        }
    }

    fn validate(confidence: f64, stake: f64) -> EntryValidation {
        validate_entry(
            &market(confidence),
            confidence,
            stake,
            VolatilityTier::Medium,
            &TradingConfig::default(),
            &FeeModel::new(FeeConfig::default()),
        )
    }

    #[test]
    fn test_high_confidence_large_stake_passes() {
        // $25 at 90%: EV = 0.9*3.75 - 0.1*3.0 = 3.075, fees 0.895
        let v = validate(90.0, 25.0);
        assert!(v.valid, "reasons: {:?}", v.reasons);
        assert!((v.expected_profit - 3.075).abs() < 1e-9);
        assert!((v.fee_cost - 0.895).abs() < 1e-9);
        assert!((v.edge_after_fees - 2.18).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_fails_every_check() {
        // 40% confidence: negative EV, negative edge, below threshold
        let v = validate(40.0, 10.0);
        assert!(!v.valid);
        assert_eq!(v.reasons.len(), 3);
        assert!(v.expected_profit < 0.0);
    }

    #[test]
    fn test_only_the_failing_check_is_reported() {
        // $1 at 75%: EV = 0.0825 clears the 0.05 floor and confidence is
        // at threshold, but fixed gas swamps the edge on a stake this
        // small: edge = 0.0825 - 0.055 = 0.0275 < 0.03
        let v = validate(75.0, 1.0);
        assert!(!v.valid);
        assert_eq!(v.reasons.len(), 1);
        assert!(v.reasons[0].contains("edge after fees"));
    }

    #[test]
    fn test_break_even_is_reported() {
        let v = validate(90.0, 10.0);
        assert!((v.break_even_profit - 0.47).abs() < 1e-9);
        assert!((v.min_profit_required - 0.047).abs() < 1e-9);
    }
}
