//! CSV replay feed.
//!
//! Columns (by header name): `timestamp,bid,ask,volume,high_24h,low_24h`.
//! Timestamps are RFC 3339 or integer Unix seconds. A row with an empty bid,
//! ask or volume cell is a gap in the feed; any other unparseable value is
//! fatal. Volume defaults to 0 only when the file has no volume column.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::StringRecord;

use crate::domain::error::EngineError;
use crate::domain::sample::PriceSample;
use crate::ports::market_data_port::{FeedEvent, MarketDataPort};

#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    bid: usize,
    ask: usize,
    volume: Option<usize>,
    high_24h: Option<usize>,
    low_24h: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, EngineError> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let require = |name: &str| {
            find(name).ok_or_else(|| EngineError::Feed {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            timestamp: require("timestamp")?,
            bid: require("bid")?,
            ask: require("ask")?,
            volume: find("volume"),
            high_24h: find("high_24h"),
            low_24h: find("low_24h"),
        })
    }
}

pub struct CsvSampleFeed<R: Read> {
    reader: csv::Reader<R>,
    columns: Columns,
    record: StringRecord,
}

impl CsvSampleFeed<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EngineError::Feed {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvSampleFeed<R> {
    pub fn from_reader(reader: R) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers().map_err(|e| EngineError::Feed {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;
        Ok(Self {
            reader,
            columns,
            record: StringRecord::new(),
        })
    }

    fn line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or(0)
    }

    fn field(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or("")
    }

    fn number(&self, name: &str, index: usize) -> Result<f64, EngineError> {
        let raw = self.field(index);
        raw.parse::<f64>().map_err(|e| EngineError::MalformedSample {
            reason: format!("line {}: invalid {} value {:?}: {}", self.line(), name, raw, e),
        })
    }

    fn optional_number(&self, name: &str, index: Option<usize>) -> Result<Option<f64>, EngineError> {
        match index {
            Some(i) if !self.field(i).is_empty() => self.number(name, i).map(Some),
            _ => Ok(None),
        }
    }

    fn parse_record(&self) -> Result<FeedEvent, EngineError> {
        let c = self.columns;
        let timestamp = parse_timestamp(self.field(c.timestamp)).ok_or_else(|| EngineError::MalformedSample {
            reason: format!(
                "line {}: invalid timestamp {:?}",
                self.line(),
                self.field(c.timestamp)
            ),
        })?;

        if self.field(c.bid).is_empty() || self.field(c.ask).is_empty() {
            return Ok(FeedEvent::Gap(format!("no quote at {timestamp}")));
        }
        if c.volume.is_some_and(|i| self.field(i).is_empty()) {
            return Ok(FeedEvent::Gap(format!("no volume at {timestamp}")));
        }
        let bid = self.number("bid", c.bid)?;
        let ask = self.number("ask", c.ask)?;
        let volume = self.optional_number("volume", c.volume)?.unwrap_or(0.0);
        let high_24h = self.optional_number("high_24h", c.high_24h)?.unwrap_or(ask);
        let low_24h = self.optional_number("low_24h", c.low_24h)?.unwrap_or(bid);

        Ok(FeedEvent::Sample(PriceSample::from_quote(
            timestamp, bid, ask, volume, high_24h, low_24h,
        )))
    }
}

impl<R: Read> MarketDataPort for CsvSampleFeed<R> {
    fn next_event(&mut self) -> Result<FeedEvent, EngineError> {
        let mut record = std::mem::take(&mut self.record);
        let more = self.reader.read_record(&mut record).map_err(|e| EngineError::Feed {
            reason: format!("CSV parse error: {}", e),
        });
        self.record = record;
        if !more? {
            return Ok(FeedEvent::Exhausted);
        }
        let event = self.parse_record()?;
        if let FeedEvent::Gap(reason) = &event {
            tracing::debug!(line = self.line(), "{}", reason);
        }
        Ok(event)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}
