//! Fee and P&L model
//!
//! Pure arithmetic over a fee schedule: slippage, spread, taker fee on
//! winnings, and fixed gas per round trip. Fees are recomputed from
//! scratch whenever the stake or the win/loss outcome changes.

use serde::{Deserialize, Serialize};

use crate::config::FeeConfig;
use crate::market::VolatilityTier;

/// Itemized cost of one round-trip trade. Derived, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub slippage: f64,
    pub spread_cost: f64,
    pub trading_fee: f64,
    pub gas_cost: f64,
    pub total: f64,
    pub percentage_of_stake: f64,
}

/// Fee model bound to one fee schedule
#[derive(Debug, Clone, Default)]
pub struct FeeModel {
    config: FeeConfig,
}

impl FeeModel {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    /// Compute the full fee breakdown for a trade of `stake` dollars.
    /// The taker fee applies only when the position is winning. A zero
    /// stake yields an all-zero breakdown.
    pub fn compute_fees(&self, stake: f64, tier: VolatilityTier, is_winning: bool) -> FeeBreakdown {
        if stake == 0.0 {
            return FeeBreakdown::default();
        }

        let slippage = stake * self.config.slippage(tier);
        let spread_cost = stake * (self.config.typical_spread / 2.0);
        let trading_fee = if is_winning {
            stake * self.config.taker_fee
        } else {
            0.0
        };
        // Entry + exit transactions
        let gas_cost = self.config.gas_per_tx_usd * 2.0;

        let total = slippage + spread_cost + trading_fee + gas_cost;

        FeeBreakdown {
            slippage,
            spread_cost,
            trading_fee,
            gas_cost,
            total,
            percentage_of_stake: (total / stake) * 100.0,
        }
    }

    /// Minimum gross profit needed to cover entry slippage + half-spread
    /// plus exit slippage + taker fee plus gas both ways.
    pub fn break_even_profit(&self, stake: f64, tier: VolatilityTier) -> f64 {
        let slippage = self.config.slippage(tier);
        let entry_fees = stake * (slippage + self.config.typical_spread / 2.0);
        let exit_fees = stake * (slippage + self.config.taker_fee);
        entry_fees + exit_fees + self.config.gas_per_tx_usd * 2.0
    }

    /// Net P&L after fees for a given gross P&L
    pub fn net_pnl(&self, gross_pnl: f64, stake: f64, tier: VolatilityTier) -> f64 {
        let fees = self.compute_fees(stake, tier, gross_pnl > 0.0);
        gross_pnl - fees.total
    }
}
