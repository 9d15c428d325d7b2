//! Trade readiness auditing
//!
//! Pure statistics over a closed-trade history, scored against promotion
//! criteria for moving beyond paper trading. Cannot fail and has no side
//! effects.

use serde::{Deserialize, Serialize};

use crate::engine::TradeOutcome;

/// Minimums a paper-trading record must clear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessCriteria {
    pub min_trades: usize,
    pub min_win_rate: f64,
    pub min_profit_factor: f64,
    pub max_drawdown: f64,
}

impl Default for ReadinessCriteria {
    fn default() -> Self {
        Self {
            min_trades: 50,
            min_win_rate: 0.55,
            min_profit_factor: 1.2,
            max_drawdown: 0.20,
        }
    }
}

/// One required-vs-actual row of the report
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessCheck {
    pub name: &'static str,
    pub required: String,
    pub actual: String,
    pub passed: bool,
}

/// Full audit result
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub checks: Vec<ReadinessCheck>,
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
}

/// Gross profit over gross loss. `+inf` with profits and no losses,
/// 0 with neither.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = -pnls.iter().filter(|p| **p < 0.0).sum::<f64>();

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Largest peak-to-trough equity give-back as a fraction of the peak,
/// scanned over the running P&L sum
pub fn max_drawdown(pnls: &[f64]) -> f64 {
    let mut peak = 0.0f64;
    let mut worst = 0.0f64;
    let mut running = 0.0f64;

    for pnl in pnls {
        running += pnl;
        peak = peak.max(running);
        let drawdown = if peak > 0.0 { (peak - running) / peak } else { 0.0 };
        worst = worst.max(drawdown);
    }
    worst
}

/// Fraction of trades with positive net P&L
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|p| **p > 0.0).count() as f64 / pnls.len() as f64
}

/// Score a closed-trade history against the promotion criteria
pub fn evaluate_readiness(
    history: &[TradeOutcome],
    criteria: &ReadinessCriteria,
) -> ReadinessReport {
    let pnls: Vec<f64> = history.iter().map(|o| o.net_pnl).collect();

    let trade_count = pnls.len();
    let win_rate = win_rate(&pnls);
    let profit_factor = profit_factor(&pnls);
    let max_drawdown = max_drawdown(&pnls);

    let checks = vec![
        ReadinessCheck {
            name: "minimum paper trades",
            required: criteria.min_trades.to_string(),
            actual: trade_count.to_string(),
            passed: trade_count >= criteria.min_trades,
        },
        ReadinessCheck {
            name: "win rate",
            required: format!("{:.0}%", criteria.min_win_rate * 100.0),
            actual: format!("{:.1}%", win_rate * 100.0),
            passed: win_rate >= criteria.min_win_rate,
        },
        ReadinessCheck {
            name: "profit factor",
            required: format!("{:.2}", criteria.min_profit_factor),
            actual: format!("{:.2}", profit_factor),
            passed: profit_factor >= criteria.min_profit_factor,
        },
        ReadinessCheck {
            name: "max drawdown",
            required: format!("< {:.0}%", criteria.max_drawdown * 100.0),
            actual: format!("{:.1}%", max_drawdown * 100.0),
            passed: max_drawdown <= criteria.max_drawdown,
        },
    ];

    ReadinessReport {
        ready: checks.iter().all(|c| c.passed),
        checks,
        trade_count,
        win_rate,
        profit_factor,
        max_drawdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExitReason;
    use crate::fees::FeeBreakdown;
    use crate::market::PriceSource;
    use chrono::Utc;
    use uuid::Uuid;

    fn outcome(net_pnl: f64) -> TradeOutcome {
        TradeOutcome {
            id: Uuid::new_v4(),
            market_id: "m".to_string(),
            question: "q".to_string(),
            entry_price: 0.5,
            exit_price: 0.5,
            shares: 10,
            stake: 5.0,
            gross_pnl: net_pnl,
            net_pnl,
            fees: FeeBreakdown::default(),
            hold_secs: 10,
            exit_reason: ExitReason::Manual,
            source: PriceSource::Real,
            confidence: 80.0,
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_profit_factor_edges() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[10.0, 5.0]), f64::INFINITY);
        assert_eq!(profit_factor(&[-10.0]), 0.0);
        assert!((profit_factor(&[10.0, -5.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_and_profit_factor_scan() {
        let pnls = [10.0, -5.0, 20.0, -30.0, 5.0];
        // Running equity 10, 5, 25, -5, 0: peak 25 after the third
        // trade, trough -5 after the fourth
        assert!((max_drawdown(&pnls) - 1.2).abs() < 1e-12);
        assert!((profit_factor(&pnls) - 1.0).abs() < 1e-12);
        assert!((win_rate(&pnls) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_with_no_peak_is_zero() {
        // Never profitable: peak stays 0, no ratio to report
        assert_eq!(max_drawdown(&[-5.0, -10.0]), 0.0);
    }

    #[test]
    fn test_readiness_fails_short_history() {
        let history: Vec<TradeOutcome> = (0..10).map(|_| outcome(1.0)).collect();
        let report = evaluate_readiness(&history, &ReadinessCriteria::default());

        assert!(!report.ready);
        assert!(!report.checks[0].passed); // trade count
        assert!(report.checks[1].passed); // win rate 100%
        assert!(report.checks[2].passed); // profit factor +inf
        assert!(report.checks[3].passed); // no drawdown
    }

    #[test]
    fn test_readiness_passes_solid_history() {
        // 60% winners at 10:1 payoff: PF = 36*10 / 24*1 = 15, and losses
        // small enough that no peak gives back more than 20%
        let mut history = Vec::new();
        for i in 0..60 {
            history.push(outcome(if i % 5 < 3 { 10.0 } else { -1.0 }));
        }
        let report = evaluate_readiness(&history, &ReadinessCriteria::default());
        assert!(report.ready, "checks: {:?}", report.checks);
        assert_eq!(report.trade_count, 60);
        assert!((report.win_rate - 0.6).abs() < 1e-12);
        assert!((report.profit_factor - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_readiness_flags_deep_drawdown() {
        // Profitable overall but gives back most of the peak mid-run
        let mut history: Vec<TradeOutcome> = (0..50).map(|_| outcome(2.0)).collect();
        history.push(outcome(-80.0));
        for _ in 0..20 {
            history.push(outcome(2.0));
        }
        let report = evaluate_readiness(&history, &ReadinessCriteria::default());
        assert!(!report.ready);
        let dd_check = &report.checks[3];
        assert!(!dd_check.passed);
        assert!((report.max_drawdown - 0.8).abs() < 1e-12);
    }
}
