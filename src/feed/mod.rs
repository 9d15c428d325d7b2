//! Real-time price feed: live WebSocket connection, bounded history,
//! and the policy-gated fallback simulator.

mod connection;
mod history;
mod messages;
mod simulator;

pub use connection::{
    ConnectionStatus, FeedError, FeedEvent, PriceCallback, PriceFeedConnection, PriceUpdate,
};
pub use history::{momentum_of, MomentumLabel, PriceHistory, PricePoint, PriceStats};
pub use messages::{parse_price_message, ControlMessage, PriceMessage};
pub use simulator::FallbackPriceSimulator;
