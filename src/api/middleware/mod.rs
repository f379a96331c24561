//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: resolves the bearer session to a caller
//! 2. Audit logger: records the request with the caller id

pub mod audit;
pub mod auth;
