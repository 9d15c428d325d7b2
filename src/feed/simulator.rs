//! Fallback price simulator
//!
//! A pure random walk used only when the live feed is degraded and the
//! session policy explicitly permits simulated data. Every output is
//! tagged `PriceSource::Simulated` so nothing downstream can mistake it
//! for market data.

use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use crate::config::FeedConfig;
use crate::feed::history::PriceStats;
use crate::market::{PriceSource, VolatilityTier};

#[derive(Debug, Clone)]
struct SimulatedPrice {
    current: f64,
    start: f64,
    step: f64,
    momentum: i32,
    tick_count: u64,
    high: f64,
    low: f64,
}

/// Random-walk price generator, one record per initialized market
#[derive(Debug, Default)]
pub struct FallbackPriceSimulator {
    prices: HashMap<String, SimulatedPrice>,
}

impl FallbackPriceSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a market with its starting price and per-tier step size
    pub fn initialize(
        &mut self,
        market_id: &str,
        start_price: f64,
        tier: VolatilityTier,
        config: &FeedConfig,
    ) {
        debug!(market = market_id, %tier, start_price, "initializing simulated prices");
        self.prices.insert(
            market_id.to_string(),
            SimulatedPrice {
                current: start_price,
                start: start_price,
                step: config.sim_step(tier),
                momentum: 0,
                tick_count: 0,
                high: start_price,
                low: start_price,
            },
        );
    }

    /// Advance the walk one step: a uniform draw from [-1, 1] scaled by
    /// the tier step, clamped to [0.01, 0.99]. Returns the new price, or
    /// `None` for a market that was never initialized.
    pub fn tick(&mut self, market_id: &str) -> Option<f64> {
        let record = self.prices.get_mut(market_id)?;
        record.tick_count += 1;

        let draw: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        let new_price = (record.current + draw * record.step).clamp(0.01, 0.99);

        // Consecutive moves in one direction accumulate; a reversal (or a
        // flat tick) restarts the count at the latest direction.
        if (new_price > record.current && record.momentum >= 0)
            || (new_price < record.current && record.momentum <= 0)
        {
            record.momentum += if new_price > record.current { 1 } else { -1 };
        } else {
            record.momentum = if new_price > record.current { 1 } else { -1 };
        }

        record.current = new_price;
        record.high = record.high.max(new_price);
        record.low = record.low.min(new_price);

        Some(new_price)
    }

    pub fn price(&self, market_id: &str) -> Option<f64> {
        self.prices.get(market_id).map(|r| r.current)
    }

    pub fn stats(&self, market_id: &str) -> Option<PriceStats> {
        let record = self.prices.get(market_id)?;
        Some(PriceStats {
            current: record.current,
            start: record.start,
            high: record.high,
            low: record.low,
            change: record.current - record.start,
            change_percent: if record.start != 0.0 {
                (record.current - record.start) / record.start * 100.0
            } else {
                0.0
            },
            momentum: record.momentum,
            sample_count: record.tick_count as usize,
            source: PriceSource::Simulated,
        })
    }

    pub fn clear(&mut self) {
        self.prices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator_with(market_id: &str, start: f64, tier: VolatilityTier) -> FallbackPriceSimulator {
        let mut sim = FallbackPriceSimulator::new();
        sim.initialize(market_id, start, tier, &FeedConfig::default());
        sim
    }

    #[test]
    fn test_tick_unknown_market() {
        let mut sim = FallbackPriceSimulator::new();
        assert_eq!(sim.tick("nope"), None);
        assert_eq!(sim.price("nope"), None);
        assert!(sim.stats("nope").is_none());
    }

    #[test]
    fn test_steps_bounded_by_tier() {
        let mut sim = simulator_with("m", 0.50, VolatilityTier::Medium);
        let mut prev = 0.50;
        for _ in 0..500 {
            let next = sim.tick("m").unwrap();
            assert!((next - prev).abs() <= 0.006 + 1e-12);
            assert!((0.01..=0.99).contains(&next));
            prev = next;
        }
    }

    #[test]
    fn test_clamped_to_price_band() {
        let mut sim = simulator_with("m", 0.011, VolatilityTier::High);
        for _ in 0..1000 {
            let p = sim.tick("m").unwrap();
            assert!(p >= 0.01);
        }
        let mut sim = simulator_with("m", 0.989, VolatilityTier::High);
        for _ in 0..1000 {
            let p = sim.tick("m").unwrap();
            assert!(p <= 0.99);
        }
    }

    #[test]
    fn test_stats_track_extremes_and_provenance() {
        let mut sim = simulator_with("m", 0.50, VolatilityTier::High);
        for _ in 0..50 {
            sim.tick("m");
        }
        let stats = sim.stats("m").unwrap();
        assert_eq!(stats.source, PriceSource::Simulated);
        assert_eq!(stats.start, 0.50);
        assert_eq!(stats.sample_count, 50);
        assert!(stats.high >= stats.current && stats.high >= stats.start);
        assert!(stats.low <= stats.current && stats.low <= stats.start);
        assert!((stats.change - (stats.current - 0.50)).abs() < 1e-12);
    }

    #[test]
    fn test_momentum_tracks_consecutive_direction() {
        let mut sim = simulator_with("m", 0.50, VolatilityTier::Medium);
        let mut prev = 0.50;
        let mut expected = 0i32;
        for _ in 0..200 {
            let next = sim.tick("m").unwrap();
            if (next > prev && expected >= 0) || (next < prev && expected <= 0) {
                expected += if next > prev { 1 } else { -1 };
            } else {
                expected = if next > prev { 1 } else { -1 };
            }
            assert_eq!(sim.stats("m").unwrap().momentum, expected);
            prev = next;
        }
    }

    #[test]
    fn test_clear() {
        let mut sim = simulator_with("m", 0.5, VolatilityTier::Low);
        sim.clear();
        assert_eq!(sim.tick("m"), None);
    }
}
