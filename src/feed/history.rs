//! Bounded per-market price history and the momentum heuristic

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::market::PriceSource;

/// One observed price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub timestamp_ms: u64,
}

/// Snapshot statistics over a market's recent prices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceStats {
    pub current: f64,
    pub start: f64,
    pub high: f64,
    pub low: f64,
    pub change: f64,
    pub change_percent: f64,
    pub momentum: i32,
    pub sample_count: usize,
    pub source: PriceSource,
}

/// Human-readable momentum bucket for display surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl MomentumLabel {
    pub fn from_momentum(momentum: i32) -> Self {
        if momentum >= 3 {
            Self::StrongBullish
        } else if momentum >= 1 {
            Self::Bullish
        } else if momentum <= -3 {
            Self::StrongBearish
        } else if momentum <= -1 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for MomentumLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBullish => write!(f, "strong bullish"),
            Self::Bullish => write!(f, "bullish"),
            Self::Neutral => write!(f, "neutral"),
            Self::Bearish => write!(f, "bearish"),
            Self::StrongBearish => write!(f, "strong bearish"),
        }
    }
}

/// Signed count of rises minus falls over the most recent consecutive
/// pairs (at most four), or 0 when fewer than three samples exist. A
/// tie-break heuristic, not an estimator; the window is deliberately
/// short.
pub fn momentum_of(points: &[PricePoint]) -> i32 {
    if points.len() < 3 {
        return 0;
    }

    let mut momentum = 0;
    let floor = points.len().saturating_sub(5);
    let mut i = points.len() - 1;
    while i > floor {
        if points[i].price > points[i - 1].price {
            momentum += 1;
        } else if points[i].price < points[i - 1].price {
            momentum -= 1;
        }
        i -= 1;
    }
    momentum
}

/// Ring buffer of recent prices for one market, bounded to a fixed
/// capacity with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    cap: usize,
}

impl PriceHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, price: f64, timestamp_ms: u64) {
        self.points.push_back(PricePoint {
            price,
            timestamp_ms,
        });
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.points.back().map(|p| p.price)
    }

    /// Contiguous copy of the retained points, oldest first
    pub fn snapshot(&self) -> Vec<PricePoint> {
        self.points.iter().copied().collect()
    }

    pub fn momentum(&self) -> i32 {
        let points = self.snapshot();
        momentum_of(&points)
    }

    pub fn stats(&self) -> Option<PriceStats> {
        let current = self.last_price()?;
        let start = self.points.front()?.price;
        let mut high = f64::MIN;
        let mut low = f64::MAX;
        for p in &self.points {
            high = high.max(p.price);
            low = low.min(p.price);
        }

        Some(PriceStats {
            current,
            start,
            high,
            low,
            change: current - start,
            change_percent: if start != 0.0 {
                (current - start) / start * 100.0
            } else {
                0.0
            },
            momentum: self.momentum(),
            sample_count: self.points.len(),
            source: PriceSource::Real,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_from(prices: &[f64]) -> PriceHistory {
        let mut h = PriceHistory::new(60);
        for (i, p) in prices.iter().enumerate() {
            h.push(*p, i as u64);
        }
        h
    }

    #[test]
    fn test_momentum_requires_three_samples() {
        assert_eq!(history_from(&[]).momentum(), 0);
        assert_eq!(history_from(&[0.5]).momentum(), 0);
        assert_eq!(history_from(&[0.5, 0.6]).momentum(), 0);
    }

    #[test]
    fn test_momentum_counts_last_four_deltas() {
        // up, up, down, up over the trailing window => +2
        assert_eq!(history_from(&[0.5, 0.51, 0.52, 0.50, 0.53]).momentum(), 2);
        // monotone rise saturates at +4
        assert_eq!(
            history_from(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]).momentum(),
            4
        );
        // flat pairs contribute nothing
        assert_eq!(history_from(&[0.5, 0.5, 0.5, 0.5]).momentum(), 0);
    }

    #[test]
    fn test_momentum_ignores_older_samples() {
        // A long rally followed by four falls reads fully bearish
        assert_eq!(
            history_from(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.4, 0.3, 0.2, 0.1]).momentum(),
            -4
        );
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = PriceHistory::new(3);
        for i in 0..5 {
            h.push(i as f64, i as u64);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.snapshot()[0].price, 2.0);
        assert_eq!(h.last_price(), Some(4.0));
    }

    #[test]
    fn test_stats() {
        let h = history_from(&[0.50, 0.60, 0.40, 0.55]);
        let stats = h.stats().unwrap();
        assert_eq!(stats.start, 0.50);
        assert_eq!(stats.current, 0.55);
        assert_eq!(stats.high, 0.60);
        assert_eq!(stats.low, 0.40);
        assert!((stats.change - 0.05).abs() < 1e-12);
        assert!((stats.change_percent - 10.0).abs() < 1e-9);
        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.source, PriceSource::Real);

        assert!(history_from(&[]).stats().is_none());
    }

    #[test]
    fn test_momentum_labels() {
        assert_eq!(MomentumLabel::from_momentum(4), MomentumLabel::StrongBullish);
        assert_eq!(MomentumLabel::from_momentum(3), MomentumLabel::StrongBullish);
        assert_eq!(MomentumLabel::from_momentum(1), MomentumLabel::Bullish);
        assert_eq!(MomentumLabel::from_momentum(0), MomentumLabel::Neutral);
        assert_eq!(MomentumLabel::from_momentum(-1), MomentumLabel::Bearish);
        assert_eq!(MomentumLabel::from_momentum(-3), MomentumLabel::StrongBearish);
    }
}
