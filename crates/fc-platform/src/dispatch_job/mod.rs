//! Dispatch Job Aggregate
//!
//! The durable unit of webhook delivery and the Job Store contract
//! the scheduler, router, and mediator share.

pub mod entity;
pub mod repository;

// Re-export main types
pub use entity::{DispatchJob, DispatchStatus};
pub use repository::DispatchJobRepository;
