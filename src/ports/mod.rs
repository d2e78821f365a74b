//! Port traits the engine talks to; adapters implement them.

pub mod config_port;
pub mod execution_port;
pub mod market_data_port;
pub mod snapshot_sink;
