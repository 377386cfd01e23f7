//! Service Account Aggregate
//!
//! Machine-to-machine identity management.

pub mod entity;
pub mod repository;

// Re-export main types
pub use entity::{ServiceAccount, RoleAssignment};
pub use repository::ServiceAccountRepository;
