//! Domain error types.
//!
//! [`EngineError`] is reserved for conditions that stop the control loop:
//! bad configuration, malformed input, and violated bookkeeping invariants.
//! Ordinary market conditions (gaps, wide spreads, risk breaches) are reported
//! as tick outcomes instead.

use chrono::{DateTime, Utc};

/// Why a tick was skipped without touching indicators or regime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataGap {
    #[error("no sample available: {reason}")]
    Missing { reason: String },

    #[error("stale sample at {timestamp} (already processed)")]
    Stale { timestamp: DateTime<Utc> },
}

/// Top-level error type for adaptrader.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed sample: {reason}")]
    MalformedSample { reason: String },

    #[error("out-of-order sample: {received} is earlier than {previous}")]
    OutOfOrderSample {
        previous: DateTime<Utc>,
        received: DateTime<Utc>,
    },

    #[error("market data feed error: {reason}")]
    Feed { reason: String },

    #[error("executor error: {reason}")]
    Executor { reason: String },

    #[error("unknown trade id {id}")]
    UnknownTrade { id: u64 },

    #[error("fill for trade {id} rejected: {reason}")]
    FillMismatch { id: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Feed { .. }
            | EngineError::MalformedSample { .. }
            | EngineError::OutOfOrderSample { .. } => 3,
            EngineError::Executor { .. }
            | EngineError::UnknownTrade { .. }
            | EngineError::FillMismatch { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn config_invalid_message() {
        let err = EngineError::invalid("sizing", "safety_factor", "must be in (0, 1]");
        assert_eq!(
            err.to_string(),
            "invalid config value [sizing] safety_factor: must be in (0, 1]"
        );
    }

    #[test]
    fn stale_gap_message_mentions_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let gap = DataGap::Stale { timestamp: ts };
        assert!(gap.to_string().contains("2024-03-01"));
    }

    fn code_of(err: &EngineError) -> String {
        format!("{:?}", std::process::ExitCode::from(err))
    }

    fn code(value: u8) -> String {
        format!("{:?}", std::process::ExitCode::from(value))
    }

    #[test]
    fn exit_codes_by_category() {
        let cfg = EngineError::ConfigMissing {
            section: "engine".into(),
            key: "instrument".into(),
        };
        assert_eq!(code_of(&cfg), code(2));

        let feed = EngineError::Feed {
            reason: "closed".into(),
        };
        assert_eq!(code_of(&feed), code(3));

        let exec = EngineError::UnknownTrade { id: 7 };
        assert_eq!(code_of(&exec), code(4));
    }
}
