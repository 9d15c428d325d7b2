//! Live price feed connection with auto-reconnect
//!
//! One logical WebSocket connection to the streaming price source,
//! multiplexing per-market subscriptions over it. Consumers register a
//! callback per market; inbound ticks update the bounded history and are
//! delivered through that callback. On unexpected close the connection
//! schedules reconnect attempts with capped exponential backoff and gives
//! up permanently once the attempt budget is spent.

use futures::{SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::FeedConfig;
use crate::feed::history::{PriceHistory, PricePoint, PriceStats};
use crate::feed::messages::{parse_price_message, ControlMessage};
use crate::market::PriceSource;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors surfaced by the feed connection
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport did not open within {0:?}")]
    ConnectionTimeout(Duration),

    #[error("transport error: {0}")]
    Connection(String),

    #[error("not connected to the price feed")]
    NotConnected,

    #[error("gave up after {0} reconnect attempts")]
    ReconnectExhausted(u32),
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// A price tick delivered to a subscription callback
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    pub market_id: String,
    pub price: f64,
    /// Previously stored price, if any
    pub previous: Option<f64>,
    /// Change from the previous price (0 on the first tick)
    pub change: f64,
    pub momentum: i32,
    /// Snapshot of the retained history, oldest first
    pub history: Vec<PricePoint>,
    pub source: PriceSource,
}

/// Per-market subscription callback
pub type PriceCallback = Box<dyn FnMut(PriceUpdate) + Send>;

/// Notable outcomes of driving the connection one step
#[derive(Debug)]
pub enum FeedEvent {
    /// An inbound frame was processed (price ticks reach callbacks)
    Message,
    /// Transport dropped; a reconnect attempt is scheduled
    ConnectionLost { attempt: u32, delay: Duration },
    /// A scheduled reconnect attempt succeeded
    Reconnected,
    /// A scheduled reconnect attempt failed; another may be scheduled
    ReconnectFailed,
    /// Retry budget spent; the feed stays down until reconnected manually
    ReconnectExhausted,
}

/// WebSocket price feed with per-market subscription routing
pub struct PriceFeedConnection {
    config: FeedConfig,
    status: ConnectionStatus,
    ws: Option<WsStream>,
    callbacks: HashMap<String, PriceCallback>,
    subscriptions: HashSet<String>,
    prices: HashMap<String, f64>,
    histories: HashMap<String, PriceHistory>,
    reconnect_attempts: u32,
    reconnect_at: Option<Instant>,
    exhausted: bool,
}

impl PriceFeedConnection {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::Disconnected,
            ws: None,
            callbacks: HashMap::new(),
            subscriptions: HashSet::new(),
            prices: HashMap::new(),
            histories: HashMap::new(),
            reconnect_attempts: 0,
            reconnect_at: None,
            exhausted: false,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// True once the retry budget is spent
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Last stored price for a market
    pub fn price(&self, market_id: &str) -> Option<f64> {
        self.prices.get(market_id).copied()
    }

    /// Statistics over the retained history for a market
    pub fn stats(&self, market_id: &str) -> Option<PriceStats> {
        self.histories.get(market_id).and_then(|h| h.stats())
    }

    /// Establish the stream. Resolves once the transport signals open,
    /// errors with `ConnectionTimeout` when the deadline passes first.
    /// Success resets the reconnect budget and re-sends subscribe
    /// messages for every market still registered.
    pub async fn connect(&mut self) -> Result<(), FeedError> {
        self.status = ConnectionStatus::Connecting;
        info!(url = %self.config.ws_url, "connecting to price feed");

        let timeout = self.config.connect_timeout();
        let connected =
            tokio::time::timeout(timeout, connect_async(self.config.ws_url.as_str())).await;

        let (ws, _) = match connected {
            Err(_) => {
                self.status = ConnectionStatus::Disconnected;
                return Err(FeedError::ConnectionTimeout(timeout));
            }
            Ok(Err(e)) => {
                self.status = ConnectionStatus::Disconnected;
                return Err(FeedError::Connection(e.to_string()));
            }
            Ok(Ok(pair)) => pair,
        };

        self.ws = Some(ws);
        self.status = ConnectionStatus::Connected;
        self.reconnect_attempts = 0;
        self.exhausted = false;
        info!("price feed connected");

        // Restore server-side routing for subscriptions that survived a drop
        let markets: Vec<String> = self.subscriptions.iter().cloned().collect();
        for market_id in markets {
            debug!(market = %market_id, "re-subscribing after connect");
            self.send_control(ControlMessage::subscribe(&market_id))
                .await?;
        }

        Ok(())
    }

    /// Register `on_update` for a market and announce the subscription.
    /// Re-subscribing the same market replaces the prior callback.
    pub async fn subscribe(
        &mut self,
        market_id: &str,
        on_update: PriceCallback,
    ) -> Result<(), FeedError> {
        if !self.is_connected() {
            return Err(FeedError::NotConnected);
        }

        self.send_control(ControlMessage::subscribe(market_id)).await?;
        self.callbacks.insert(market_id.to_string(), on_update);
        self.subscriptions.insert(market_id.to_string());
        info!(market = %market_id, "subscribed to market");
        Ok(())
    }

    /// Drop a market's subscription and callback. A no-op for markets
    /// that were never subscribed; the control message is only sent
    /// while connected.
    pub async fn unsubscribe(&mut self, market_id: &str) {
        self.callbacks.remove(market_id);
        let was_subscribed = self.subscriptions.remove(market_id);

        if was_subscribed && self.is_connected() {
            if let Err(e) = self.send_control(ControlMessage::unsubscribe(market_id)).await {
                warn!(market = %market_id, error = %e, "failed to send unsubscribe");
            }
        }
    }

    /// Close the transport and clear all subscriptions, callbacks, and
    /// any pending reconnect. Idempotent; a reconnect that was scheduled
    /// before this call will not fire.
    pub async fn disconnect(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.close(None).await;
        }
        self.status = ConnectionStatus::Disconnected;
        self.callbacks.clear();
        self.subscriptions.clear();
        self.reconnect_at = None;
        info!("price feed disconnected");
    }

    /// Drive the connection one step: process one inbound frame, or wake
    /// for a due reconnect attempt. Pends forever when there is nothing
    /// to do (disconnected with no retry scheduled), which makes it safe
    /// to park in a `select!` arm.
    pub async fn run_once(&mut self) -> FeedEvent {
        if let Some(ws) = self.ws.as_mut() {
            return match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    self.handle_message(&text);
                    FeedEvent::Message
                }
                Some(Ok(Message::Close(_))) | None => {
                    warn!("price feed closed by remote");
                    self.connection_lost()
                }
                Some(Ok(_)) => FeedEvent::Message,
                Some(Err(e)) => {
                    warn!(error = %e, "price feed transport error");
                    self.connection_lost()
                }
            };
        }

        match self.reconnect_at {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.reconnect_at = None;
                match self.connect().await {
                    Ok(()) => FeedEvent::Reconnected,
                    Err(e) => {
                        warn!(attempt = self.reconnect_attempts, error = %e, "reconnect failed");
                        match self.schedule_reconnect() {
                            Some(_) => FeedEvent::ReconnectFailed,
                            None => FeedEvent::ReconnectExhausted,
                        }
                    }
                }
            }
            // Nothing to drive
            None => std::future::pending().await,
        }
    }

    /// Backoff before reconnect attempt `attempt`, doubling from the
    /// base and capped
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(30);
        let ms = self
            .config
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.config.backoff_cap_ms);
        Duration::from_millis(ms)
    }

    fn connection_lost(&mut self) -> FeedEvent {
        self.ws = None;
        self.status = ConnectionStatus::Disconnected;
        match self.schedule_reconnect() {
            Some((attempt, delay)) => FeedEvent::ConnectionLost { attempt, delay },
            None => FeedEvent::ReconnectExhausted,
        }
    }

    /// Book the next reconnect attempt, or give up once the budget is
    /// spent. Giving up is reported, not thrown: the owner decides what
    /// a dead feed means for the session.
    fn schedule_reconnect(&mut self) -> Option<(u32, Duration)> {
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            self.exhausted = true;
            self.reconnect_at = None;
            error!(
                attempts = self.reconnect_attempts,
                "max reconnect attempts reached, giving up on price feed"
            );
            return None;
        }

        self.reconnect_attempts += 1;
        let delay = self.backoff_delay(self.reconnect_attempts);
        self.reconnect_at = Some(Instant::now() + delay);
        warn!(
            attempt = self.reconnect_attempts,
            max = self.config.max_reconnect_attempts,
            ?delay,
            "price feed lost, reconnect scheduled"
        );
        Some((self.reconnect_attempts, delay))
    }

    /// Process one inbound frame. Malformed frames are dropped silently:
    /// one corrupt tick must never interrupt the stream.
    fn handle_message(&mut self, text: &str) {
        let Some(msg) = parse_price_message(text) else {
            trace!(frame = text, "dropping unparseable frame");
            return;
        };

        let previous = self.prices.insert(msg.market_id.clone(), msg.price);
        let cap = self.config.history_len;
        let history = self
            .histories
            .entry(msg.market_id.clone())
            .or_insert_with(|| PriceHistory::new(cap));
        history.push(msg.price, chrono::Utc::now().timestamp_millis() as u64);

        let momentum = history.momentum();
        let snapshot = history.snapshot();

        if let Some(callback) = self.callbacks.get_mut(&msg.market_id) {
            callback(PriceUpdate {
                market_id: msg.market_id,
                price: msg.price,
                previous,
                change: previous.map_or(0.0, |p| msg.price - p),
                momentum,
                history: snapshot,
                source: PriceSource::Real,
            });
        }
    }

    async fn send_control(&mut self, msg: ControlMessage) -> Result<(), FeedError> {
        let ws = self.ws.as_mut().ok_or(FeedError::NotConnected)?;
        let json = serde_json::to_string(&msg).map_err(|e| FeedError::Connection(e.to_string()))?;
        ws.send(Message::Text(json))
            .await
            .map_err(|e| FeedError::Connection(e.to_string()))
    }
}
