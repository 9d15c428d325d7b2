//! Configuration for a trading session
//!
//! Every tunable lives here with defaults matching the Polymarket fee
//! schedule and the paper-trading risk limits. The binary overrides
//! individual fields from CLI flags / environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::market::VolatilityTier;

/// Fee schedule used by the fee model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Taker fee charged on winnings (Polymarket: 2%)
    pub taker_fee: f64,

    /// Slippage rate for liquid markets
    pub slippage_low: f64,

    /// Slippage rate for average markets
    pub slippage_medium: f64,

    /// Slippage rate for illiquid markets
    pub slippage_high: f64,

    /// Typical bid-ask spread (half is paid on entry)
    pub typical_spread: f64,

    /// Estimated gas per transaction in USD (Polygon)
    pub gas_per_tx_usd: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            taker_fee: 0.02,
            slippage_low: 0.005,
            slippage_medium: 0.01,
            slippage_high: 0.02,
            typical_spread: 0.01,
            gas_per_tx_usd: 0.01,
        }
    }
}

impl FeeConfig {
    /// Slippage rate for a volatility tier
    pub fn slippage(&self, tier: VolatilityTier) -> f64 {
        match tier {
            VolatilityTier::Low => self.slippage_low,
            VolatilityTier::Medium => self.slippage_medium,
            VolatilityTier::High => self.slippage_high,
        }
    }
}

/// Entry gating and exit policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Take-profit target as a fraction of stake
    pub take_profit_pct: f64,

    /// Stop-loss trigger as a fraction of stake
    pub stop_loss_pct: f64,

    /// Minimum expected profit to enter, as a fraction of stake
    pub min_expected_profit_pct: f64,

    /// Minimum edge over fees to enter, as a fraction of stake
    pub min_edge_over_fees_pct: f64,

    /// Minimum predictor confidence (0-100) to enter
    pub min_confidence: f64,

    /// Confidence value treated as the 1.0x sizing baseline
    pub confidence_baseline: f64,

    /// Position sizing multiplier applied on top of the confidence ratio
    pub position_leverage: f64,

    /// Countdown duration per trade in seconds
    pub timer_secs: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            take_profit_pct: 0.15,
            stop_loss_pct: 0.12,
            min_expected_profit_pct: 0.05,
            min_edge_over_fees_pct: 0.03,
            min_confidence: 75.0,
            confidence_baseline: 75.0,
            position_leverage: 1.5,
            timer_secs: 20,
        }
    }
}

/// Price feed connection and fallback-simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint for the streaming price source
    pub ws_url: String,

    /// Deadline for the transport to signal open
    pub connect_timeout_secs: u64,

    /// Consecutive reconnect failures tolerated before giving up
    pub max_reconnect_attempts: u32,

    /// Base reconnect backoff in milliseconds (doubles per attempt)
    pub backoff_base_ms: u64,

    /// Backoff ceiling in milliseconds
    pub backoff_cap_ms: u64,

    /// Price points retained per market
    pub history_len: usize,

    /// Cadence of the per-trade price refresh timer in milliseconds
    pub refresh_interval_ms: u64,

    /// Permit simulated prices when the live feed is unavailable.
    /// Simulated data is always tagged as such downstream.
    pub allow_simulated: bool,

    /// Simulated per-tick step for stable markets
    pub sim_step_low: f64,

    /// Simulated per-tick step for average markets
    pub sim_step_medium: f64,

    /// Simulated per-tick step for volatile markets
    pub sim_step_high: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://ws-subscriptions-clob.polymarket.com/ws/market".to_string(),
            connect_timeout_secs: 10,
            max_reconnect_attempts: 5,
            backoff_base_ms: 1000,
            backoff_cap_ms: 30000,
            history_len: 60,
            refresh_interval_ms: 1000,
            allow_simulated: false,
            sim_step_low: 0.003,
            sim_step_medium: 0.006,
            sim_step_high: 0.01,
        }
    }
}

impl FeedConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Simulated price step for a volatility tier
    pub fn sim_step(&self, tier: VolatilityTier) -> f64 {
        match tier {
            VolatilityTier::Low => self.sim_step_low,
            VolatilityTier::Medium => self.sim_step_medium,
            VolatilityTier::High => self.sim_step_high,
        }
    }
}

/// Bankroll and session-level risk limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Bankroll at session start
    pub starting_bankroll: f64,

    /// Cumulative session P&L at or below this locks the session
    pub red_zone_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            starting_bankroll: 1000.0,
            red_zone_threshold: -100.0,
        }
    }
}

/// Top-level session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub fees: FeeConfig,
    pub trading: TradingConfig,
    pub feed: FeedConfig,
    pub risk: RiskConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slippage_lookup() {
        let fees = FeeConfig::default();
        assert_eq!(fees.slippage(VolatilityTier::Low), 0.005);
        assert_eq!(fees.slippage(VolatilityTier::Medium), 0.01);
        assert_eq!(fees.slippage(VolatilityTier::High), 0.02);
    }

    #[test]
    fn test_feed_durations() {
        let feed = FeedConfig::default();
        assert_eq!(feed.connect_timeout(), Duration::from_secs(10));
        assert_eq!(feed.refresh_interval(), Duration::from_millis(1000));
    }
}
