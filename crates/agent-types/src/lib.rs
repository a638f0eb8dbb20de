//! Core types and traits for the memory-backed agent.
//!
//! Messages follow the OpenAI chat shape; memory DTOs follow the Mem0 v1 API
//! so they round-trip through the hosted service unchanged.

mod dto;
mod traits;

pub use dto::*;
pub use traits::*;
