//! Dispatch Job Entity
//!
//! Represents async delivery of an event/task to a subscriber webhook.
//! Tracks full lifecycle with an ordered attempt history.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use bson::serde_helpers::chrono_datetime_as_bson_datetime;

/// Dispatch job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchKind {
    Event,
    Task,
}

impl Default for DispatchKind {
    fn default() -> Self {
        Self::Event
    }
}

/// Dispatch job lifecycle status.
///
/// Terminal states (`Completed`, `Error`, `Cancelled`) are sticky: once
/// reached, no further attempt is ever recorded against the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Pending,
    Queued,
    InProgress,
    Completed,
    Error,
    Cancelled,
}

impl Default for DispatchStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl DispatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Dispatch mode controlling per-group ordering behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchMode {
    /// Process independently of other jobs in the same group.
    Immediate,
    /// A failure in this group does not block later jobs in it.
    NextOnError,
    /// A failure in this group blocks later `BLOCK_ON_ERROR` jobs in it
    /// until the failed job leaves the ERROR state.
    BlockOnError,
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Immediate
    }
}

impl From<&str> for DispatchMode {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "NEXT_ON_ERROR" => Self::NextOnError,
            "BLOCK_ON_ERROR" => Self::BlockOnError,
            _ => Self::Immediate,
        }
    }
}

/// Target protocol for dispatch. The core speaks one protocol today;
/// the field exists so the wire schema doesn't need to change when a
/// second one is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchProtocol {
    HttpWebhook,
}

impl Default for DispatchProtocol {
    fn default() -> Self {
        Self::HttpWebhook
    }
}

/// Classification of why a delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Transient,
    NotTransient,
    Unknown,
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Success,
    Failure,
    Timeout,
    CircuitOpen,
}

/// One row of a job's attempt history. Attempts are append-only and
/// ordered by `attempt_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchAttempt {
    pub attempt_number: u32,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub attempted_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<i64>,

    pub status: AttemptStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,

    /// Truncated to a bounded size before being stored; attempts must
    /// never grow a job document without bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stack_trace: Option<String>,
}

/// Response bodies are stored for operator diagnosis only; cap well
/// below the mongo document limit so a chatty endpoint can't bloat
/// the job.
pub const MAX_RESPONSE_BODY_LEN: usize = 2048;

fn truncate_body(body: Option<String>) -> Option<String> {
    body.map(|mut s| {
        if s.len() > MAX_RESPONSE_BODY_LEN {
            s.truncate(MAX_RESPONSE_BODY_LEN);
            s.push_str("...(truncated)");
        }
        s
    })
}

impl DispatchAttempt {
    pub fn started(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            attempted_at: Utc::now(),
            completed_at: None,
            duration_millis: None,
            status: AttemptStatus::Failure,
            error_type: None,
            response_code: None,
            response_body: None,
            error_message: None,
            error_stack_trace: None,
        }
    }

    pub fn success(attempt_number: u32, attempted_at: DateTime<Utc>, response_code: u16, response_body: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            attempt_number,
            attempted_at,
            completed_at: Some(now),
            duration_millis: Some((now - attempted_at).num_milliseconds()),
            status: AttemptStatus::Success,
            error_type: None,
            response_code: Some(response_code),
            response_body: truncate_body(response_body),
            error_message: None,
            error_stack_trace: None,
        }
    }

    pub fn failure(
        attempt_number: u32,
        attempted_at: DateTime<Utc>,
        status: AttemptStatus,
        error_type: ErrorType,
        response_code: Option<u16>,
        response_body: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            attempt_number,
            attempted_at,
            completed_at: Some(now),
            duration_millis: Some((now - attempted_at).num_milliseconds()),
            status,
            error_type: Some(error_type),
            response_code,
            response_body: truncate_body(response_body),
            error_message: Some(error_message.into()),
            error_stack_trace: None,
        }
    }
}

/// Custom metadata attached by the producer of the job; carried
/// through unchanged, never interpreted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMetadata {
    pub key: String,
    pub value: String,
}

/// A durable unit of webhook delivery.
///
/// Fields are grouped into immutable (set at creation, never changed
/// again) and mutable (owned by the scheduler/router state machine)
/// for readability; Mongo has no column-level immutability so this is
/// purely a convention enforced by which methods touch which fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchJob {
    /// TSID as Crockford Base32 string — opaque, sortable, time-ordered.
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    // === Classification (immutable) ===
    #[serde(default)]
    pub kind: DispatchKind,
    pub code: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    // === Target (immutable) ===
    pub target_url: String,
    #[serde(default)]
    pub protocol: DispatchProtocol,

    // === Payload (immutable) ===
    pub payload: String,
    #[serde(default = "default_content_type")]
    pub payload_content_type: String,
    /// If true the mediator sends `payload` verbatim as the request
    /// body. If false it wraps `payload` in the envelope described in
    /// the webhook contract.
    #[serde(default)]
    pub data_only: bool,

    // === Context (immutable) ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,

    // === Dispatch behaviour (immutable) ===
    pub dispatch_pool_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_group: Option<String>,
    #[serde(default)]
    pub mode: DispatchMode,

    // === Execution settings (immutable) ===
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub scheduled_for: Option<DateTime<Utc>>,

    // === Status (mutable) ===
    #[serde(default)]
    pub status: DispatchStatus,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub attempts: Vec<DispatchAttempt>,

    #[serde(default)]
    pub metadata: Vec<DispatchMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    // === Timestamps (mutable) ===
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<i64>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

#[allow(clippy::too_many_arguments)]
impl DispatchJob {
    pub fn new(
        kind: DispatchKind,
        code: impl Into<String>,
        source: impl Into<String>,
        target_url: impl Into<String>,
        payload: impl Into<String>,
        dispatch_pool_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::TsidGenerator::generate(),
            external_id: None,
            kind,
            code: code.into(),
            source: source.into(),
            subject: None,
            target_url: target_url.into(),
            protocol: DispatchProtocol::HttpWebhook,
            payload: payload.into(),
            payload_content_type: default_content_type(),
            data_only: false,
            event_id: None,
            correlation_id: None,
            causation_id: None,
            service_account_id: None,
            dispatch_pool_code: dispatch_pool_code.into(),
            message_group: None,
            mode: DispatchMode::Immediate,
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            scheduled_for: None,
            status: DispatchStatus::Pending,
            attempt_count: 0,
            last_error: None,
            attempts: vec![],
            metadata: vec![],
            idempotency_key: None,
            created_at: now,
            updated_at: now,
            queued_at: None,
            completed_at: None,
            duration_millis: None,
        }
    }

    pub fn for_event(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
        target_url: impl Into<String>,
        payload: impl Into<String>,
        dispatch_pool_code: impl Into<String>,
    ) -> Self {
        let mut job = Self::new(DispatchKind::Event, event_type, source, target_url, payload, dispatch_pool_code);
        job.event_id = Some(event_id.into());
        job
    }

    pub fn for_task(
        code: impl Into<String>,
        source: impl Into<String>,
        target_url: impl Into<String>,
        payload: impl Into<String>,
        dispatch_pool_code: impl Into<String>,
    ) -> Self {
        Self::new(DispatchKind::Task, code, source, target_url, payload, dispatch_pool_code)
    }

    pub fn with_service_account_id(mut self, id: impl Into<String>) -> Self {
        self.service_account_id = Some(id.into());
        self
    }

    pub fn with_message_group(mut self, group: impl Into<String>) -> Self {
        self.message_group = Some(group.into());
        self
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_data_only(mut self, data_only: bool) -> Self {
        self.data_only = data_only;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u32) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_scheduled_for(mut self, scheduled_for: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(scheduled_for);
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.push(DispatchMetadata { key: key.into(), value: value.into() });
    }

    pub fn can_retry(&self) -> bool {
        !self.status.is_terminal() && self.attempt_count < self.max_retries
    }
}

/// Exponential backoff used by the scheduler to compute `scheduledFor`
/// for a re-promoted job, and by the router when a broker NACK needs
/// an explicit delay hint rather than relying on default visibility.
pub fn retry_backoff(attempt_number: u32, base: std::time::Duration, multiplier: f64, max: std::time::Duration) -> std::time::Duration {
    let exp = multiplier.powi((attempt_number.max(1) - 1) as i32);
    let secs = (base.as_secs_f64() * exp).min(max.as_secs_f64());
    std::time::Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_max() {
        let base = std::time::Duration::from_secs(3);
        let max = std::time::Duration::from_secs(600);
        assert_eq!(retry_backoff(1, base, 2.0, max), std::time::Duration::from_secs(3));
        assert_eq!(retry_backoff(2, base, 2.0, max), std::time::Duration::from_secs(6));
        assert_eq!(retry_backoff(3, base, 2.0, max), std::time::Duration::from_secs(12));
        // 3 * 2^9 = 1536, capped to 600
        assert_eq!(retry_backoff(10, base, 2.0, max), max);
    }

    #[test]
    fn new_job_defaults_to_pending() {
        let job = DispatchJob::for_event("evt-1", "order.created", "orders", "https://sub.example.com/hook", "{}", "default");
        assert_eq!(job.status, DispatchStatus::Pending);
        assert_eq!(job.attempt_count, 0);
        assert!(job.attempts.is_empty());
        assert!(job.can_retry());
    }
}
