//! Shared Module
//!
//! Cross-cutting concerns shared by the job store aggregates: error
//! types, sortable ID generation, and collection index setup.

pub mod error;
pub mod indexes;
pub mod tsid;

pub use error::{PlatformError, Result};
pub use tsid::TsidGenerator;
