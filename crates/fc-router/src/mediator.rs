//! Mediator - HTTP delivery of dispatch jobs to subscriber webhooks
//!
//! `mediate()` is the router-facing half of the HTTP mediator
//! algorithm: given a bare `Message` pointer it resolves the full
//! `DispatchJob` from the job store, resolves the target service
//! account's credentials, signs and sends the request, classifies the
//! response, and appends the resulting `DispatchAttempt` back to the
//! job store before returning the ACK/NACK-driving `MediationOutcome`
//! to the caller.

use async_trait::async_trait;
use chrono::Utc;
use fc_common::{Message, MediationType, MediationResult, MediationOutcome, WarningCategory, WarningSeverity};
use fc_platform::dispatch_job::entity::{AttemptStatus, DispatchAttempt, DispatchStatus, ErrorType, retry_backoff};
use fc_platform::DispatchJobRepository;
use hmac::{Hmac, Mac};
use mongodb::bson::doc;
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error, debug};

use crate::circuit_breaker_registry::CircuitBreakerRegistry;
use crate::credentials::CredentialCache;
use crate::warning::WarningService;

/// Signature header carrying the hex HMAC-SHA256 of `timestamp + body`.
pub const SIGNATURE_HEADER: &str = "X-FlowCatalyst-Signature";
/// Unix-seconds timestamp the signature was computed over.
pub const TIMESTAMP_HEADER: &str = "X-FlowCatalyst-Timestamp";

type HmacSha256 = Hmac<Sha256>;

/// Compute the webhook HMAC: `hex(HMAC-SHA256(signingSecret, timestamp ++ body))`.
fn sign(body: &str, timestamp: i64, signing_secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// JSON envelope the mediator wraps `payload` in unless the job opted
/// into `dataOnly` delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEnvelope<'a> {
    id: &'a str,
    kind: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<&'a str>,
    timestamp: String,
    data: serde_json::Value,
}

/// Trait for message mediation. Implementors resolve the full job,
/// deliver it, and persist the attempt — `pool.rs` only sees the
/// resulting ACK/NACK-driving outcome.
#[async_trait]
pub trait Mediator: Send + Sync {
    async fn mediate(&self, message: &Message) -> MediationOutcome;
}

/// HTTP version to use for mediation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    /// HTTP/1.1 - better for development/debugging
    Http1,
    /// HTTP/2 - better for production (multiplexing, header compression)
    #[default]
    Http2,
}

/// Configuration for HTTP mediator
#[derive(Debug, Clone)]
pub struct HttpMediatorConfig {
    pub timeout: Duration,
    pub http_version: HttpVersion,
    pub connect_timeout: Duration,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_success_threshold: u32,
    pub circuit_breaker_timeout: Duration,
    pub retry_base: Duration,
    pub retry_multiplier: f64,
    pub retry_max: Duration,
}

impl Default for HttpMediatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            http_version: HttpVersion::Http2,
            connect_timeout: Duration::from_secs(10),
            circuit_breaker_threshold: 10,
            circuit_breaker_success_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(30),
            retry_base: Duration::from_secs(3),
            retry_multiplier: 2.0,
            retry_max: Duration::from_secs(600),
        }
    }
}

impl HttpMediatorConfig {
    pub fn dev() -> Self {
        Self {
            http_version: HttpVersion::Http1,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self::default()
    }
}

/// HTTP-based message mediator: job resolution, credential lookup,
/// signing, delivery, response classification, and job-store
/// bookkeeping in one place.
pub struct HttpMediator {
    client: Client,
    config: HttpMediatorConfig,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    warning_service: Option<Arc<WarningService>>,
    job_store: Arc<DispatchJobRepository>,
    credentials: Arc<CredentialCache>,
}

impl HttpMediator {
    pub fn new(job_store: Arc<DispatchJobRepository>, credentials: Arc<CredentialCache>) -> Self {
        Self::with_config(HttpMediatorConfig::default(), job_store, credentials)
    }

    pub fn dev(job_store: Arc<DispatchJobRepository>, credentials: Arc<CredentialCache>) -> Self {
        Self::with_config(HttpMediatorConfig::dev(), job_store, credentials)
    }

    pub fn production(job_store: Arc<DispatchJobRepository>, credentials: Arc<CredentialCache>) -> Self {
        Self::with_config(HttpMediatorConfig::production(), job_store, credentials)
    }

    pub fn with_config(
        config: HttpMediatorConfig,
        job_store: Arc<DispatchJobRepository>,
        credentials: Arc<CredentialCache>,
    ) -> Self {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10);

        match config.http_version {
            HttpVersion::Http1 => {
                builder = builder.http1_only();
                info!("HttpMediator configured for HTTP/1.1");
            }
            HttpVersion::Http2 => {
                info!("HttpMediator configured for HTTP/2 (ALPN negotiation)");
            }
        }

        let client = builder.build().expect("Failed to build HTTP client");

        let circuit_breakers = Arc::new(CircuitBreakerRegistry::new(crate::circuit_breaker_registry::CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker_threshold,
            success_threshold: config.circuit_breaker_success_threshold,
            reset_timeout: config.circuit_breaker_timeout,
            buffer_size: 100,
        }));

        info!(
            timeout_secs = config.timeout.as_secs(),
            http_version = ?config.http_version,
            "HttpMediator initialized"
        );

        Self { client, config, circuit_breakers, warning_service: None, job_store, credentials }
    }

    pub fn with_warning_service(mut self, warning_service: Arc<WarningService>) -> Self {
        self.warning_service = Some(warning_service);
        self
    }

    pub fn set_warning_service(&mut self, warning_service: Arc<WarningService>) {
        self.warning_service = Some(warning_service);
    }

    fn warn_config(&self, message_id: &str, target: &str, status_code: u16, description: &str) {
        if let Some(ref ws) = self.warning_service {
            let severity = if status_code == 501 {
                WarningSeverity::Critical
            } else {
                WarningSeverity::Error
            };
            ws.add_warning(
                WarningCategory::Configuration,
                severity,
                format!("HTTP {} {} for message {}: Target: {}", status_code, description, message_id, target),
                "HttpMediator".to_string(),
            );
        }
    }

    /// Circuit breaker state for a target, keyed by the full target
    /// URL — each subscriber endpoint trips independently.
    pub fn circuit_state(&self, target_url: &str) -> crate::circuit_breaker_registry::CircuitBreakerState {
        self.circuit_breakers.get_state(target_url).unwrap_or(crate::circuit_breaker_registry::CircuitBreakerState::Closed)
    }

    /// Build the request body per the job's `dataOnly` flag: raw
    /// payload verbatim, or the payload wrapped in the webhook
    /// envelope.
    fn build_body(job: &fc_platform::DispatchJob) -> String {
        if job.data_only {
            return job.payload.clone();
        }

        let data: serde_json::Value = serde_json::from_str(&job.payload)
            .unwrap_or(serde_json::Value::String(job.payload.clone()));

        let envelope = WebhookEnvelope {
            id: &job.id,
            kind: match job.kind {
                fc_platform::dispatch_job::entity::DispatchKind::Event => "EVENT",
                fc_platform::dispatch_job::entity::DispatchKind::Task => "TASK",
            },
            code: &job.code,
            subject: job.subject.as_deref(),
            event_id: job.event_id.as_deref(),
            correlation_id: job.correlation_id.as_deref(),
            timestamp: Utc::now().to_rfc3339(),
            data,
        };
        serde_json::to_string(&envelope).unwrap_or_else(|_| job.payload.clone())
    }

    /// Deliver one attempt against an already-loaded job. Does not
    /// touch the job store — that's done by the caller once the
    /// outcome and resulting status transition are both known.
    async fn deliver(&self, job: &fc_platform::DispatchJob) -> (MediationOutcome, bool) {
        if !self.circuit_breakers.allow_request(&job.target_url) {
            debug!(job_id = %job.id, target = %job.target_url, "Circuit breaker open, rejecting request");
            return (MediationOutcome::circuit_open(), true);
        }

        let creds = match &job.service_account_id {
            Some(id) => match self.credentials.resolve(id).await {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "Failed to resolve service account credentials");
                    return (MediationOutcome::error_config(0, None, format!("credential resolution failed: {}", e)), false);
                }
            },
            None => None,
        };

        let body = Self::build_body(job);
        let timestamp = Utc::now().timestamp();

        let mut request = self.client
            .post(&job.target_url)
            .timeout(Duration::from_secs(job.timeout_seconds as u64))
            .header("Content-Type", job.payload_content_type.clone())
            .header("X-FlowCatalyst-ID", job.id.clone())
            .header("X-FlowCatalyst-Kind", match job.kind {
                fc_platform::dispatch_job::entity::DispatchKind::Event => "EVENT",
                fc_platform::dispatch_job::entity::DispatchKind::Task => "TASK",
            })
            .header("X-FlowCatalyst-Code", job.code.clone())
            .header("X-FlowCatalyst-Timestamp", timestamp.to_string());

        if let Some(subject) = &job.subject {
            request = request.header("X-FlowCatalyst-Subject", subject.clone());
        }
        if let Some(causation_id) = &job.causation_id {
            request = request.header("X-FlowCatalyst-Causation-ID", causation_id.clone());
        }
        if let Some(correlation_id) = &job.correlation_id {
            request = request.header("X-FlowCatalyst-Correlation-ID", correlation_id.clone());
        }

        if let Some(creds) = &creds {
            if let Some(token) = &creds.auth_token {
                request = request.bearer_auth(token);
            }
            if let Some(secret) = &creds.signing_secret {
                let signature = sign(&body, timestamp, secret);
                request = request.header(SIGNATURE_HEADER, signature);
            }
        }

        request = request.body(body);

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let response_body = response.text().await.ok();

                if status.is_success() {
                    self.circuit_breakers.record_success(&job.target_url);
                    info!(job_id = %job.id, status_code, "Message delivered successfully");
                    MediationOutcome::success(status_code, response_body)
                } else if matches!(status_code, 401 | 403 | 404 | 405 | 501) {
                    // Configuration errors. Not counted as circuit
                    // breaker failures — the endpoint is reachable, it
                    // just rejects this request's shape permanently.
                    self.circuit_breakers.record_success(&job.target_url);
                    let desc = match status_code {
                        401 => "Unauthorized",
                        403 => "Forbidden",
                        404 => "Not Found",
                        405 => "Method Not Allowed",
                        _ => "Not Implemented",
                    };
                    warn!(job_id = %job.id, status_code, "{}", desc);
                    self.warn_config(&job.id, &job.target_url, status_code, desc);
                    MediationOutcome::error_config(status_code, response_body, format!("HTTP {}: {}", status_code, desc))
                } else if status.is_client_error() {
                    self.circuit_breakers.record_success(&job.target_url);
                    warn!(job_id = %job.id, status_code, "Client error");
                    MediationOutcome::error_config(status_code, response_body, format!("HTTP {}: client error", status_code))
                } else if status.is_server_error() {
                    self.circuit_breakers.record_failure(&job.target_url);
                    warn!(job_id = %job.id, status_code, "Server error - transient");
                    MediationOutcome::error_process(Some(status_code), Some(30), response_body, format!("HTTP {}: server error", status_code))
                } else {
                    warn!(job_id = %job.id, status_code, "Unexpected status code");
                    MediationOutcome::error_process(Some(status_code), Some(30), response_body, format!("HTTP {}: unexpected status", status_code))
                }
            }
            Err(e) => {
                self.circuit_breakers.record_failure(&job.target_url);
                if e.is_timeout() {
                    warn!(job_id = %job.id, error = %e, "Request timeout");
                    MediationOutcome::error_connection("request timeout".to_string())
                } else if e.is_connect() {
                    warn!(job_id = %job.id, error = %e, "Connection error");
                    MediationOutcome::error_connection(format!("connection error: {}", e))
                } else {
                    error!(job_id = %job.id, error = %e, "Request failed");
                    MediationOutcome::error_connection(format!("request failed: {}", e))
                }
            }
        };

        (outcome, false)
    }

    /// Persist the delivery attempt and apply the resulting status
    /// transition. `QUEUED` is the status the scheduler/router leave
    /// the job in before dispatch; a successful delivery completes it,
    /// a non-transient failure or exhausted retry budget errors it,
    /// and anything else goes back to `PENDING` with `scheduledFor`
    /// bumped by the backoff curve for the scheduler's promote loop to
    /// pick up again.
    async fn record_attempt(&self, job: &fc_platform::DispatchJob, outcome: &MediationOutcome, circuit_open: bool) {
        let attempt_number = job.attempt_count + 1;
        let attempted_at = Utc::now();

        let (attempt, error_type) = match outcome.result {
            MediationResult::Success => (
                DispatchAttempt::success(attempt_number, attempted_at, outcome.status_code.unwrap_or(200), outcome.response_body.clone()),
                None,
            ),
            MediationResult::ErrorConfig => (
                DispatchAttempt::failure(
                    attempt_number, attempted_at, AttemptStatus::Failure, ErrorType::NotTransient,
                    outcome.status_code, outcome.response_body.clone(),
                    outcome.error_message.clone().unwrap_or_default(),
                ),
                Some(ErrorType::NotTransient),
            ),
            MediationResult::ErrorProcess | MediationResult::ErrorConnection => {
                let status = if circuit_open { AttemptStatus::CircuitOpen } else { AttemptStatus::Failure };
                (
                    DispatchAttempt::failure(
                        attempt_number, attempted_at, status, ErrorType::Transient,
                        outcome.status_code, outcome.response_body.clone(),
                        outcome.error_message.clone().unwrap_or_default(),
                    ),
                    Some(ErrorType::Transient),
                )
            }
        };

        let not_transient = error_type == Some(ErrorType::NotTransient);
        let retries_exhausted = attempt_number >= job.max_retries;

        let (new_status, extra_patch) = if outcome.result == MediationResult::Success {
            (DispatchStatus::Completed, None)
        } else if not_transient || retries_exhausted {
            (DispatchStatus::Error, None)
        } else {
            let delay = retry_backoff(attempt_number, self.config.retry_base, self.config.retry_multiplier, self.config.retry_max);
            let scheduled_for = Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64);
            let patch = doc! { "scheduledFor": scheduled_for };
            (DispatchStatus::Pending, Some(patch))
        };

        let last_error = outcome.error_message.clone();

        if let Err(e) = self.job_store
            .append_attempt(&job.id, DispatchStatus::Queued, &attempt, new_status, last_error, extra_patch)
            .await
        {
            // A lost CAS race here means another worker (or the
            // stale-recovery loop) already moved the job on; the
            // delivery itself still happened and its ACK/NACK outcome
            // to the broker is unaffected.
            warn!(job_id = %job.id, error = %e, "Failed to record dispatch attempt");
        }
    }
}

#[async_trait]
impl Mediator for HttpMediator {
    async fn mediate(&self, message: &Message) -> MediationOutcome {
        if message.mediation_type != MediationType::HTTP {
            return MediationOutcome::error_config(0, None, format!("unsupported mediation type: {:?}", message.mediation_type));
        }

        let job = match self.job_store.find_by_id(&message.id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(message_id = %message.id, "Dispatch job not found, acking to drop");
                return MediationOutcome::error_config(0, None, "dispatch job not found".to_string());
            }
            Err(e) => {
                error!(message_id = %message.id, error = %e, "Job store lookup failed");
                return MediationOutcome::error_connection(format!("job store unavailable: {}", e));
            }
        };

        if job.status.is_terminal() {
            debug!(job_id = %job.id, status = job.status.as_str(), "Job already terminal, acking without redelivery");
            return MediationOutcome::success(0, None);
        }

        let (outcome, circuit_open) = self.deliver(&job).await;
        self.record_attempt(&job, &outcome, circuit_open).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_timestamp_and_body() {
        let sig1 = sign("{}", 1000, "secret");
        let sig2 = sign("{}", 1000, "secret");
        assert_eq!(sig1, sig2);

        let sig3 = sign("{}", 1001, "secret");
        assert_ne!(sig1, sig3);
    }

    #[test]
    fn builds_envelope_body_for_non_data_only_job() {
        let job = fc_platform::DispatchJob::for_event(
            "evt-1", "order.created", "orders", "https://sub.example.com/hook", "{\"amount\":5}", "default",
        );
        let body = HttpMediator::build_body(&job);
        assert!(body.contains("\"kind\":\"EVENT\""));
        assert!(body.contains("\"amount\":5"));
    }

    #[test]
    fn builds_raw_body_for_data_only_job() {
        let job = fc_platform::DispatchJob::for_event(
            "evt-1", "order.created", "orders", "https://sub.example.com/hook", "{\"amount\":5}", "default",
        ).with_data_only(true);
        let body = HttpMediator::build_body(&job);
        assert_eq!(body, "{\"amount\":5}");
    }
}
