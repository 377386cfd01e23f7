//! Dispatch Pool Aggregate
//!
//! Message dispatch pool management.

pub mod entity;
pub mod repository;

// Re-export main types
pub use entity::{DispatchPool, DispatchPoolStatus};
pub use repository::DispatchPoolRepository;
