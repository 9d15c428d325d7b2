//! Session wiring: drive one trade end to end against the price source
//!
//! Owns the feed connection (or, when policy allows, the fallback
//! simulator), forwards price updates into the engine through the
//! registered subscription callback, and runs the countdown and
//! price-refresh timers. Both timers are scoped to the loop, so any
//! transition into a closed trade tears them down with it. The loop is a
//! single `select!`: one tick is fully processed before the next message
//! is taken, so P&L recomputation and trigger evaluation never interleave.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::engine::{TradeLifecycleEngine, TradeOutcome};
use crate::feed::{FallbackPriceSimulator, FeedEvent, PriceFeedConnection, PriceUpdate};
use crate::market::{Market, PriceSource};

/// Open, start, and run a single trade until it closes, returning its
/// outcome. The live feed is required unless the config permits
/// simulated pricing.
pub async fn run_trade_session(
    config: SessionConfig,
    market: Market,
    stake: f64,
) -> Result<TradeOutcome> {
    let mut engine = TradeLifecycleEngine::new(config.clone());
    let mut feed = PriceFeedConnection::new(config.feed.clone());
    let mut simulator: Option<FallbackPriceSimulator> = None;

    match feed.connect().await {
        Ok(()) => {}
        Err(e) if config.feed.allow_simulated => {
            warn!(error = %e, "live feed unavailable, falling back to simulated prices");
            simulator = Some(seed_simulator(&config, &market, market.yes_price));
            engine.set_price_source(PriceSource::Simulated);
        }
        Err(e) => {
            return Err(e).context("price feed unavailable and simulated pricing not permitted")
        }
    }

    if let Err(e) = engine.open(&market, stake) {
        feed.disconnect().await;
        return Err(e.into());
    }

    // Updates reach the engine only through this registered callback;
    // the engine stays the sole mutator of trade state. Dropping a tick
    // under backpressure is fine, the next one supersedes it.
    let (tick_tx, mut tick_rx) = mpsc::channel::<PriceUpdate>(64);
    if simulator.is_none() {
        let tx = tick_tx.clone();
        feed.subscribe(
            &market.id,
            Box::new(move |update| {
                let _ = tx.try_send(update);
            }),
        )
        .await?;
    }

    engine.start()?;

    let mut countdown = tokio::time::interval(Duration::from_secs(1));
    let mut refresh = tokio::time::interval(config.feed.refresh_interval());
    // Both intervals fire immediately once armed; swallow that so the
    // countdown runs full periods
    countdown.tick().await;
    refresh.tick().await;

    let mut last_momentum = 0i32;

    let outcome = loop {
        tokio::select! {
            _ = countdown.tick() => {
                if let Some(reason) = engine.on_countdown_tick() {
                    info!(%reason, "countdown closed the trade");
                }
            }
            _ = refresh.tick() => {
                if let Some(sim) = simulator.as_mut() {
                    if let Some(price) = sim.tick(&market.id) {
                        if let Some(reason) = engine.on_price_tick(price) {
                            info!(%reason, price, "simulated tick closed the trade");
                        }
                        if let Some(stats) = sim.stats(&market.id) {
                            last_momentum = stats.momentum;
                        }
                    }
                }
                debug!(snapshot = ?engine.snapshot(last_momentum));
            }
            Some(update) = tick_rx.recv() => {
                last_momentum = update.momentum;
                if let Some(reason) = engine.on_price_tick(update.price) {
                    info!(%reason, price = update.price, "price tick closed the trade");
                }
            }
            event = feed.run_once(), if simulator.is_none() => {
                match event {
                    FeedEvent::ReconnectExhausted if config.feed.allow_simulated => {
                        warn!("live feed gone for good, switching to simulated prices");
                        let seed = engine
                            .active_trade()
                            .map(|t| t.current_price)
                            .unwrap_or(market.yes_price);
                        simulator = Some(seed_simulator(&config, &market, seed));
                        engine.set_price_source(PriceSource::Simulated);
                    }
                    FeedEvent::ReconnectExhausted => {
                        warn!(
                            "live feed gone for good, trade can now close only by \
                             countdown or manual exit"
                        );
                    }
                    FeedEvent::Reconnected => info!("price feed restored"),
                    _ => {}
                }
            }
        }

        if engine.active_trade().is_none() {
            match engine.history().last() {
                Some(outcome) => break outcome.clone(),
                None => anyhow::bail!("trade closed without an outcome"),
            }
        }
    };
    // countdown and refresh drop here: closing the trade cancels the timers

    feed.unsubscribe(&market.id).await;
    feed.disconnect().await;

    info!("{}", engine.stats_summary());
    Ok(outcome)
}

fn seed_simulator(
    config: &SessionConfig,
    market: &Market,
    start_price: f64,
) -> FallbackPriceSimulator {
    let mut sim = FallbackPriceSimulator::new();
    sim.initialize(&market.id, start_price, market.tier, &config.feed);
    sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExitReason;
    use crate::market::VolatilityTier;

    fn offline_market() -> Market {
        Market {
            id: "0xdead".to_string(),
            question: "Does the fallback engage?".to_string(),
            yes_price: 0.5,
            tier: VolatilityTier::Medium,
            confidence: 90.0,
        }
    }

    fn offline_config(allow_simulated: bool) -> SessionConfig {
        let mut config = SessionConfig::default();
        // Nothing listens here; connect fails fast
        config.feed.ws_url = "ws://127.0.0.1:9".to_string();
        config.feed.connect_timeout_secs = 1;
        config.feed.allow_simulated = allow_simulated;
        config.trading.timer_secs = 2;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_requires_live_feed_by_default() {
        let result = run_trade_session(offline_config(false), offline_market(), 10.0).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_runs_on_simulated_prices_when_permitted() {
        let outcome = run_trade_session(offline_config(true), offline_market(), 10.0)
            .await
            .unwrap();

        // A two-second timer with medium-tier steps cannot reach any
        // exit target, so the countdown closes it
        assert_eq!(outcome.exit_reason, ExitReason::TimerExpired);
        assert_eq!(outcome.source, PriceSource::Simulated);
        assert_eq!(outcome.market_id, "0xdead");
        assert!(outcome.hold_secs >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_surfaces_validator_rejection() {
        let mut market = offline_market();
        market.confidence = 10.0;
        let err = run_trade_session(offline_config(true), market, 10.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("entry rejected"));
    }
}
