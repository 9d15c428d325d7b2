//! Trade entity, lifecycle states, and the emitted outcome record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fees::FeeBreakdown;
use crate::market::{Market, PriceSource};

/// Why a trade left the `Started` state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Manual,
    TakeProfit,
    StopLoss,
    MaxLoss,
    TimerExpired,
    Cancelled,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::TakeProfit => write!(f, "take_profit"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::MaxLoss => write!(f, "max_loss"),
            Self::TimerExpired => write!(f, "timer_expired"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Trade lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeState {
    /// Position opened and stake committed, timers not yet running
    Pending,
    /// Countdown and price ticks active
    Started,
    /// Terminal
    Closed(ExitReason),
}

/// One open position. Owned exclusively by the lifecycle engine; price
/// state mutates only through tick handling.
#[derive(Debug, Clone)]
pub struct Trade {
    pub market: Market,

    /// Dollar stake committed at open
    pub stake: f64,

    /// Position size derived at open from stake, entry price, and the
    /// confidence multiplier
    pub shares: u32,

    pub entry_price: f64,
    pub current_price: f64,

    /// Net-P&L level that takes profit (positive), fixed at open
    pub take_profit_target: f64,

    /// Net-P&L level that stops out (negative), fixed at open
    pub stop_loss_target: f64,

    /// Last computed P&L; close() reuses these, it never recomputes
    pub gross_pnl: f64,
    pub fees: FeeBreakdown,
    pub net_pnl: f64,

    pub confidence: f64,
    pub source: PriceSource,
    pub state: TradeState,

    pub opened_at: DateTime<Utc>,
    pub started_at: Option<tokio::time::Instant>,

    /// Countdown seconds left once started
    pub time_remaining: i64,
}

impl Trade {
    /// Seconds held since start, 0 for a trade that never started
    pub fn hold_secs(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn pnl_percent(&self) -> f64 {
        if self.stake > 0.0 {
            self.net_pnl / self.stake * 100.0
        } else {
            0.0
        }
    }
}

/// Immutable record of a closed trade - the engine's sole artifact for
/// external persistence and analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub id: Uuid,
    pub market_id: String,
    pub question: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: u32,
    pub stake: f64,
    pub gross_pnl: f64,
    pub net_pnl: f64,
    pub fees: FeeBreakdown,
    pub hold_secs: u64,
    pub exit_reason: ExitReason,
    pub source: PriceSource,
    pub confidence: f64,
    pub closed_at: DateTime<Utc>,
}
