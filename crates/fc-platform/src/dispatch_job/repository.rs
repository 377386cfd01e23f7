//! DispatchJob Repository — the Job Store the scheduler, router, and
//! mediator share.
//!
//! `update_status` is a compare-and-swap: it only applies when the
//! document's current status still matches `from`, so a crashed
//! worker racing the stale-recovery loop can never clobber a state
//! transition made by whoever got there first.

use std::collections::HashSet;
use mongodb::{Collection, Database, bson::doc};
use futures::TryStreamExt;
use chrono::{DateTime, Utc};
use crate::dispatch_job::entity::{DispatchAttempt, DispatchJob, DispatchStatus};
use crate::shared::error::{PlatformError, Result};

pub struct DispatchJobRepository {
    collection: Collection<DispatchJob>,
}

impl DispatchJobRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("dispatch_jobs"),
        }
    }

    pub async fn insert(&self, job: &DispatchJob) -> Result<()> {
        self.collection.insert_one(job).await?;
        Ok(())
    }

    /// Bulk insert multiple dispatch jobs
    pub async fn insert_many(&self, jobs: &[DispatchJob]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(jobs).await?;
        Ok(())
    }

    /// `findById(id) -> Job?`
    pub async fn find_by_id(&self, id: &str) -> Result<Option<DispatchJob>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_event_id(&self, event_id: &str) -> Result<Vec<DispatchJob>> {
        let cursor = self.collection
            .find(doc! { "eventId": event_id })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_by_correlation_id(&self, correlation_id: &str) -> Result<Vec<DispatchJob>> {
        let cursor = self.collection
            .find(doc! { "correlationId": correlation_id })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// `listReadyPending(limit, now) -> Job[]`, ordered by
    /// `(scheduledFor, createdAt)` ascending — the scheduler's promote
    /// loop consumes this directly.
    pub async fn list_ready_pending(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<DispatchJob>> {
        use mongodb::options::FindOptions;

        let filter = doc! {
            "status": DispatchStatus::Pending.as_str(),
            "$or": [
                { "scheduledFor": { "$exists": false } },
                { "scheduledFor": null },
                { "scheduledFor": { "$lte": now } },
            ],
        };
        let options = FindOptions::builder()
            .sort(doc! { "scheduledFor": 1, "createdAt": 1 })
            .limit(limit)
            .build();
        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// `listStaleQueued(before) -> Job[]` — QUEUED jobs whose `queuedAt`
    /// predates `before`; feeds the stale-recovery loop.
    pub async fn list_stale_queued(&self, before: DateTime<Utc>) -> Result<Vec<DispatchJob>> {
        let cursor = self.collection
            .find(doc! {
                "status": DispatchStatus::Queued.as_str(),
                "queuedAt": { "$lt": before },
            })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// `listGroupsWithErrors(groups) -> set` — which of the given
    /// `messageGroup` values currently have at least one job in ERROR.
    /// Backs BLOCK_ON_ERROR gating.
    pub async fn list_groups_with_errors(&self, groups: &[String]) -> Result<HashSet<String>> {
        if groups.is_empty() {
            return Ok(HashSet::new());
        }
        let cursor = self.collection
            .find(doc! {
                "messageGroup": { "$in": groups },
                "status": DispatchStatus::Error.as_str(),
            })
            .await?;
        let jobs: Vec<DispatchJob> = cursor.try_collect().await?;
        Ok(jobs.into_iter().filter_map(|j| j.message_group).collect())
    }

    /// `atomic updateStatus(id, from, to, patch)` — fails if the job's
    /// current status no longer matches `from`. `patch` is applied in
    /// the same `$set` as the status transition.
    pub async fn update_status(
        &self,
        id: &str,
        from: DispatchStatus,
        to: DispatchStatus,
        patch: mongodb::bson::Document,
    ) -> Result<()> {
        let mut set_doc = patch;
        set_doc.insert("status", to.as_str());
        set_doc.insert("updatedAt", Utc::now());

        let result = self.collection
            .update_one(
                doc! { "_id": id, "status": from.as_str() },
                doc! { "$set": set_doc },
            )
            .await?;

        if result.matched_count == 0 {
            let actual = self.find_by_id(id).await?
                .map(|j| j.status.as_str().to_string())
                .unwrap_or_else(|| "NOT_FOUND".to_string());
            return Err(PlatformError::StatusMismatch {
                id: id.to_string(),
                expected: from.as_str().to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Reset a stale QUEUED job back to PENDING, clearing `queuedAt`.
    /// Used by the stale-recovery loop; tolerates a lost race (the
    /// router may have already advanced the job past QUEUED).
    pub async fn requeue_stale(&self, id: &str) -> Result<bool> {
        let result = self.collection
            .update_one(
                doc! { "_id": id, "status": DispatchStatus::Queued.as_str() },
                doc! { "$set": {
                    "status": DispatchStatus::Pending.as_str(),
                    "updatedAt": Utc::now(),
                }, "$unset": { "queuedAt": "" } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    /// `appendAttempt(id, attempt)` — appends the attempt record and
    /// atomically applies the status/attemptCount/timing transition
    /// the mediator computed for it. `expected_status` guards against
    /// appending to a job that has already gone terminal elsewhere.
    /// `extra_patch` carries fields the caller wants folded into the
    /// same `$set` (e.g. `scheduledFor` when the job is being re-queued
    /// for a backed-off retry).
    #[allow(clippy::too_many_arguments)]
    pub async fn append_attempt(
        &self,
        id: &str,
        expected_status: DispatchStatus,
        attempt: &DispatchAttempt,
        new_status: DispatchStatus,
        last_error: Option<String>,
        extra_patch: Option<mongodb::bson::Document>,
    ) -> Result<()> {
        let attempt_doc = mongodb::bson::to_document(attempt)?;
        let now = Utc::now();

        let mut set_doc = extra_patch.unwrap_or_default();
        set_doc.insert("status", new_status.as_str());
        set_doc.insert("updatedAt", now);
        if let Some(err) = last_error {
            set_doc.insert("lastError", err);
        }
        if new_status == DispatchStatus::Completed {
            set_doc.insert("completedAt", now);
            if let Some(completed_at) = attempt.completed_at {
                set_doc.insert("durationMillis", (completed_at - attempt.attempted_at).num_milliseconds());
            }
        }

        let result = self.collection
            .update_one(
                doc! { "_id": id, "status": expected_status.as_str() },
                doc! {
                    "$push": { "attempts": attempt_doc },
                    "$inc": { "attemptCount": 1 },
                    "$set": set_doc,
                },
            )
            .await?;

        if result.matched_count == 0 {
            let actual = self.find_by_id(id).await?
                .map(|j| j.status.as_str().to_string())
                .unwrap_or_else(|| "NOT_FOUND".to_string());
            return Err(PlatformError::StatusMismatch {
                id: id.to_string(),
                expected: expected_status.as_str().to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Count jobs by status
    pub async fn count_by_status(&self, status: DispatchStatus) -> Result<u64> {
        Ok(self.collection.count_documents(doc! { "status": status.as_str() }).await?)
    }

    /// Count all jobs
    pub async fn count_all(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    /// Find recent dispatch jobs with pagination (for debug/admin)
    pub async fn find_recent_paged(&self, page: u32, size: u32) -> Result<Vec<DispatchJob>> {
        use mongodb::options::FindOptions;

        let skip = page as u64 * size as u64;
        let options = FindOptions::builder()
            .skip(skip)
            .limit(size as i64)
            .sort(doc! { "createdAt": -1 })
            .build();

        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }
}
