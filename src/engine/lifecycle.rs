//! Trade lifecycle engine
//!
//! Owns at most one position at a time and every mutation of it: opening
//! (gated by the entry validator and the session risk lock), starting the
//! countdown, ingesting price ticks, and closing through the fixed exit
//! priority of take-profit, stop-loss, max-loss, timer. Closing settles
//! the bankroll, updates streaks, and emits an immutable `TradeOutcome`.

use chrono::Utc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::engine::trade::{ExitReason, Trade, TradeOutcome, TradeState};
use crate::feed::MomentumLabel;
use crate::fees::FeeModel;
use crate::market::{Market, PriceSource};
use crate::validator::validate_entry;

/// Recoverable reasons an engine call did not produce a new state.
/// None of these are fatal; the caller simply does not get a position.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a position is already open")]
    AlreadyOpen,

    #[error("stake ${stake:.2} exceeds available bankroll ${bankroll:.2}")]
    InsufficientFunds { stake: f64, bankroll: f64 },

    #[error("entry rejected: {}", .reasons.join("; "))]
    RejectedByValidator { reasons: Vec<String> },

    #[error("no open trade")]
    NoOpenTrade,

    #[error("session locked: cumulative P&L ${total_pnl:.2} is in the red zone")]
    SessionLocked { total_pnl: f64 },
}

/// Events emitted by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Opened { market_id: String, stake: f64 },
    Started { market_id: String },
    Closed(TradeOutcome),
    Cancelled { market_id: String },
    Locked { total_pnl: f64 },
}

/// Read-only projection for display surfaces
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineSnapshot {
    pub market_id: Option<String>,
    pub current_price: Option<f64>,
    pub net_pnl: Option<f64>,
    pub pnl_percent: Option<f64>,
    pub momentum: MomentumLabel,
    pub time_remaining: Option<i64>,
    pub locked: bool,
    pub bankroll: f64,
    pub total_pnl: f64,
}

/// State machine governing a single speculative position
pub struct TradeLifecycleEngine {
    config: SessionConfig,
    fee_model: FeeModel,
    active: Option<Trade>,
    bankroll: f64,
    total_pnl: f64,
    total_fees_paid: f64,
    consecutive_wins: u32,
    consecutive_losses: u32,
    locked: bool,
    price_source: PriceSource,
    history: Vec<TradeOutcome>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl TradeLifecycleEngine {
    pub fn new(config: SessionConfig) -> Self {
        let fee_model = FeeModel::new(config.fees.clone());
        let bankroll = config.risk.starting_bankroll;
        let (event_tx, _) = broadcast::channel(256);

        Self {
            config,
            fee_model,
            active: None,
            bankroll,
            total_pnl: 0.0,
            total_fees_paid: 0.0,
            consecutive_wins: 0,
            consecutive_losses: 0,
            locked: false,
            price_source: PriceSource::Real,
            history: Vec::new(),
            event_tx,
        }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Provenance stamped on trades opened from now on (and on the
    /// active trade, if the feed degrades mid-position)
    pub fn set_price_source(&mut self, source: PriceSource) {
        self.price_source = source;
        if let Some(trade) = self.active.as_mut() {
            trade.source = source;
        }
    }

    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    pub fn total_fees_paid(&self) -> f64 {
        self.total_fees_paid
    }

    pub fn consecutive_wins(&self) -> u32 {
        self.consecutive_wins
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn active_trade(&self) -> Option<&Trade> {
        self.active.as_ref()
    }

    pub fn history(&self) -> &[TradeOutcome] {
        &self.history
    }

    /// Open a position against a scored market. The stake is deducted
    /// immediately; timers do not run until `start()`.
    pub fn open(&mut self, market: &Market, stake: f64) -> Result<(), LifecycleError> {
        if self.locked {
            return Err(LifecycleError::SessionLocked {
                total_pnl: self.total_pnl,
            });
        }
        if self.active.is_some() {
            return Err(LifecycleError::AlreadyOpen);
        }
        if stake > self.bankroll {
            return Err(LifecycleError::InsufficientFunds {
                stake,
                bankroll: self.bankroll,
            });
        }

        let validation = validate_entry(
            market,
            market.confidence,
            stake,
            market.tier,
            &self.config.trading,
            &self.fee_model,
        );
        if !validation.valid {
            warn!(market = %market.id, reasons = ?validation.reasons, "entry rejected");
            return Err(LifecycleError::RejectedByValidator {
                reasons: validation.reasons,
            });
        }

        let trading = &self.config.trading;
        let confidence_multiplier = market.confidence / trading.confidence_baseline;
        let shares =
            ((stake / market.yes_price) * confidence_multiplier * trading.position_leverage)
                .floor() as u32;

        // Entry fees before any movement: gross 0, losing-side fee rate
        let fees = self.fee_model.compute_fees(stake, market.tier, false);
        let net_pnl = -fees.total;

        let trade = Trade {
            market: market.clone(),
            stake,
            shares,
            entry_price: market.yes_price,
            current_price: market.yes_price,
            take_profit_target: stake * trading.take_profit_pct,
            stop_loss_target: -(stake * trading.stop_loss_pct),
            gross_pnl: 0.0,
            fees,
            net_pnl,
            confidence: market.confidence,
            source: self.price_source,
            state: TradeState::Pending,
            opened_at: Utc::now(),
            started_at: None,
            time_remaining: trading.timer_secs as i64,
        };

        self.bankroll -= stake;
        info!(
            market = %market.id,
            stake,
            shares,
            expected_profit = validation.expected_profit,
            edge_after_fees = validation.edge_after_fees,
            "position opened"
        );
        let _ = self.event_tx.send(EngineEvent::Opened {
            market_id: market.id.clone(),
            stake,
        });
        self.active = Some(trade);

        Ok(())
    }

    /// Begin the countdown. Valid only from `Pending`.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        match self.active.as_mut() {
            Some(trade) if trade.state == TradeState::Pending => {
                trade.started_at = Some(Instant::now());
                trade.time_remaining = self.config.trading.timer_secs as i64;
                trade.state = TradeState::Started;
                info!(market = %trade.market.id, "trade started");
                let _ = self.event_tx.send(EngineEvent::Started {
                    market_id: trade.market.id.clone(),
                });
                Ok(())
            }
            _ => Err(LifecycleError::NoOpenTrade),
        }
    }

    /// Ingest one price tick: recompute P&L and evaluate the exit
    /// triggers in fixed priority. At most one trigger fires per tick.
    /// Ignored unless a trade is `Started`.
    pub fn on_price_tick(&mut self, new_price: f64) -> Option<ExitReason> {
        let trade = match self.active.as_mut() {
            Some(t) if t.state == TradeState::Started => t,
            _ => return None,
        };

        trade.current_price = new_price;
        trade.gross_pnl = (new_price - trade.entry_price) * trade.shares as f64;
        trade.fees =
            self.fee_model
                .compute_fees(trade.stake, trade.market.tier, trade.gross_pnl > 0.0);
        trade.net_pnl = trade.gross_pnl - trade.fees.total;

        let reason = if trade.net_pnl >= trade.take_profit_target {
            Some(ExitReason::TakeProfit)
        } else if trade.net_pnl <= trade.stop_loss_target {
            Some(ExitReason::StopLoss)
        } else if trade.net_pnl <= -trade.stake {
            Some(ExitReason::MaxLoss)
        } else {
            None
        };

        if let Some(exit) = reason {
            if let Some(trade) = self.active.take() {
                self.finalize(trade, exit);
            }
        }
        reason
    }

    /// Advance the countdown by one second. Closes with `TimerExpired`
    /// when it reaches zero. Ignored unless a trade is `Started`.
    pub fn on_countdown_tick(&mut self) -> Option<ExitReason> {
        let trade = match self.active.as_mut() {
            Some(t) if t.state == TradeState::Started => t,
            _ => return None,
        };

        trade.time_remaining -= 1;
        if trade.time_remaining > 0 {
            return None;
        }

        if let Some(trade) = self.active.take() {
            self.finalize(trade, ExitReason::TimerExpired);
        }
        Some(ExitReason::TimerExpired)
    }

    /// Close the running trade at the last computed P&L
    pub fn exit_manual(&mut self) -> Result<TradeOutcome, LifecycleError> {
        match self.active.take() {
            Some(trade) if trade.state == TradeState::Started => {
                Ok(self.finalize(trade, ExitReason::Manual))
            }
            other => {
                self.active = other;
                Err(LifecycleError::NoOpenTrade)
            }
        }
    }

    /// Abandon a position before it started. Refunds the stake in full
    /// and leaves streaks and cumulative P&L untouched.
    pub fn cancel(&mut self) -> Result<(), LifecycleError> {
        match self.active.take() {
            Some(trade) if trade.state == TradeState::Pending => {
                self.bankroll += trade.stake;
                info!(market = %trade.market.id, "trade cancelled, stake refunded");
                let _ = self.event_tx.send(EngineEvent::Cancelled {
                    market_id: trade.market.id.clone(),
                });
                Ok(())
            }
            other => {
                self.active = other;
                Err(LifecycleError::NoOpenTrade)
            }
        }
    }

    /// Unlock and restore the session to its starting state
    pub fn reset_session(&mut self) {
        if self.active.is_some() {
            warn!("resetting session with a position still open, discarding it");
            self.active = None;
        }
        self.bankroll = self.config.risk.starting_bankroll;
        self.total_pnl = 0.0;
        self.total_fees_paid = 0.0;
        self.consecutive_wins = 0;
        self.consecutive_losses = 0;
        self.locked = false;
        self.history.clear();
        info!("session reset");
    }

    /// Settle a closing trade: credit the bankroll with stake plus the
    /// last computed net P&L (never recomputed here), update streaks
    /// (ties count as wins), emit the outcome, then evaluate the
    /// red-zone lock.
    fn finalize(&mut self, mut trade: Trade, reason: ExitReason) -> TradeOutcome {
        trade.state = TradeState::Closed(reason);

        self.bankroll += trade.stake + trade.net_pnl;
        self.total_pnl += trade.net_pnl;
        self.total_fees_paid += trade.fees.total;

        if trade.net_pnl >= 0.0 {
            self.consecutive_wins += 1;
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
            self.consecutive_wins = 0;
        }

        let outcome = TradeOutcome {
            id: Uuid::new_v4(),
            market_id: trade.market.id.clone(),
            question: trade.market.question.clone(),
            entry_price: trade.entry_price,
            exit_price: trade.current_price,
            shares: trade.shares,
            stake: trade.stake,
            gross_pnl: trade.gross_pnl,
            net_pnl: trade.net_pnl,
            fees: trade.fees.clone(),
            hold_secs: trade.hold_secs(),
            exit_reason: reason,
            source: trade.source,
            confidence: trade.confidence,
            closed_at: Utc::now(),
        };

        info!(
            market = %outcome.market_id,
            %reason,
            net_pnl = outcome.net_pnl,
            fees = outcome.fees.total,
            hold_secs = outcome.hold_secs,
            "trade closed"
        );

        self.history.push(outcome.clone());
        let _ = self.event_tx.send(EngineEvent::Closed(outcome.clone()));

        if self.total_pnl <= self.config.risk.red_zone_threshold && !self.locked {
            self.locked = true;
            warn!(
                total_pnl = self.total_pnl,
                threshold = self.config.risk.red_zone_threshold,
                "red zone hit, session locked"
            );
            let _ = self.event_tx.send(EngineEvent::Locked {
                total_pnl: self.total_pnl,
            });
        }

        outcome
    }

    /// Read-only projection for UI binding. Momentum comes from the
    /// price source's stats since the engine does not track it.
    pub fn snapshot(&self, momentum: i32) -> EngineSnapshot {
        let trade = self.active.as_ref();
        EngineSnapshot {
            market_id: trade.map(|t| t.market.id.clone()),
            current_price: trade.map(|t| t.current_price),
            net_pnl: trade.map(|t| t.net_pnl),
            pnl_percent: trade.map(|t| t.pnl_percent()),
            momentum: MomentumLabel::from_momentum(momentum),
            time_remaining: trade
                .filter(|t| t.state == TradeState::Started)
                .map(|t| t.time_remaining),
            locked: self.locked,
            bankroll: self.bankroll,
            total_pnl: self.total_pnl,
        }
    }

    /// One-line session statistics
    pub fn stats_summary(&self) -> String {
        let wins = self.history.iter().filter(|o| o.net_pnl > 0.0).count();
        let win_rate = if self.history.is_empty() {
            0.0
        } else {
            wins as f64 / self.history.len() as f64 * 100.0
        };
        format!(
            "Bankroll: ${:.2} | Session P&L: ${:+.2} | Trades: {} | WR: {:.1}% | Fees: ${:.2}",
            self.bankroll,
            self.total_pnl,
            self.history.len(),
            win_rate,
            self.total_fees_paid
        )
    }
}
