//! Core domain types and logic.

pub mod config;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod portfolio;
pub mod regime;
pub mod risk;
pub mod sample;
pub mod session;
pub mod signal;
pub mod sizing;
pub mod window;
