//! FlowCatalyst Platform
//!
//! Job-store side of the dispatch subsystem: the durable `DispatchJob`
//! aggregate, the `DispatchPool` rate/concurrency configuration
//! aggregate, and the `ServiceAccount` aggregate holding webhook
//! credentials. Everything here is storage and domain modeling —
//! no HTTP surface; the router and scheduler binaries own that.
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains an `entity` module (domain types) and a
//! `repository` module (Mongo-backed data access).

pub mod dispatch_job;
pub mod dispatch_pool;
pub mod service_account;

// Shared infrastructure
pub mod shared;

// Re-export common types from shared
pub use shared::error::{PlatformError, Result};
pub use shared::tsid::TsidGenerator;

// Re-export main entity types for convenience
pub use service_account::entity::{ServiceAccount, RoleAssignment, WebhookCredentials, WebhookAuthType};
pub use dispatch_pool::entity::{DispatchPool, DispatchPoolStatus};
pub use dispatch_job::entity::{
    DispatchJob, DispatchStatus, DispatchMode, DispatchKind, DispatchProtocol,
    DispatchAttempt, DispatchMetadata, ErrorType, AttemptStatus, retry_backoff,
};

// Re-export repositories
pub use service_account::repository::ServiceAccountRepository;
pub use dispatch_pool::repository::DispatchPoolRepository;
pub use dispatch_job::repository::DispatchJobRepository;
