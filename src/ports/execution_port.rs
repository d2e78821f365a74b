//! Trade execution port trait.

use crate::domain::engine::{ExecutionRequest, Fill};
use crate::domain::error::EngineError;

/// Port for handing approved orders to an executor.
pub trait ExecutionPort {
    /// Execute the request and report what actually filled. A fill with zero
    /// quantity means the order did not execute.
    fn execute(&mut self, request: &ExecutionRequest) -> Result<Fill, EngineError>;
}
