//! adaptrader: adaptive single-instrument trading decision engine.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The [`cli`] module is a thin
//! replay/validation harness around the engine.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
