//! Concrete adapter implementations for ports.

pub mod csv_feed_adapter;
pub mod file_config_adapter;
pub mod paper_executor;
pub mod tracing_sink;
