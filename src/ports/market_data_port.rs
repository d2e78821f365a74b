//! Market data port trait.

use crate::domain::error::EngineError;
use crate::domain::sample::PriceSample;

/// One poll of the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Sample(PriceSample),
    /// The provider had nothing fresh for this tick. Never a replayed sample.
    Gap(String),
    Exhausted,
}

pub trait MarketDataPort {
    /// Next event. Errors are fatal to the session; transient fetch failures
    /// should come back as `FeedEvent::Gap`.
    fn next_event(&mut self) -> Result<FeedEvent, EngineError>;
}
