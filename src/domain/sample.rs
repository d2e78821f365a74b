//! Market sample representation.

use chrono::{DateTime, Utc};

use super::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    /// Mid price.
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

impl PriceSample {
    /// Build a sample from a top-of-book quote; price is the bid/ask midpoint.
    pub fn from_quote(
        timestamp: DateTime<Utc>,
        bid: f64,
        ask: f64,
        volume: f64,
        high_24h: f64,
        low_24h: f64,
    ) -> Self {
        PriceSample {
            timestamp,
            price: (bid + ask) / 2.0,
            bid,
            ask,
            volume,
            high_24h,
            low_24h,
        }
    }

    /// (ask - bid) / mid in basis points.
    pub fn spread_bps(&self) -> f64 {
        if self.price > 0.0 {
            (self.ask - self.bid) / self.price * 10_000.0
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let fields = [
            ("price", self.price),
            ("bid", self.bid),
            ("ask", self.ask),
            ("volume", self.volume),
            ("high_24h", self.high_24h),
            ("low_24h", self.low_24h),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::MalformedSample {
                reason: format!("{name} is not finite"),
            });
        }
        if self.bid <= 0.0 || self.price <= 0.0 {
            return Err(EngineError::MalformedSample {
                reason: format!("non-positive price (bid {}, mid {})", self.bid, self.price),
            });
        }
        if self.ask < self.bid {
            return Err(EngineError::MalformedSample {
                reason: format!("crossed quote: ask {} < bid {}", self.ask, self.bid),
            });
        }
        if self.volume < 0.0 {
            return Err(EngineError::MalformedSample {
                reason: format!("negative volume {}", self.volume),
            });
        }
        Ok(())
    }
}
