//! MongoDB Index Initialization
//!
//! Creates indexes for the job-store collections on application startup.

use mongodb::{Database, IndexModel, bson::doc, options::IndexOptions};
use tracing::info;

/// TTL for high-volume transactional data: 30 days
const TTL_30_DAYS_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Initialize all MongoDB indexes
pub async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Initializing MongoDB indexes...");

    create_dispatch_job_indexes(db).await?;
    create_dispatch_pool_indexes(db).await?;
    create_service_account_indexes(db).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

async fn create_dispatch_job_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let jobs = db.collection::<mongodb::bson::Document>("dispatch_jobs");

    // Idempotency - essential for deduplication
    jobs.create_index(
        IndexModel::builder()
            .keys(doc! { "idempotencyKey": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .sparse(true)
                .background(true)
                .build())
            .build(),
    ).await?;

    // Scheduler promote loop: listReadyPending(limit, now)
    jobs.create_index(
        IndexModel::builder()
            .keys(doc! { "status": 1, "scheduledFor": 1, "createdAt": 1 })
            .options(IndexOptions::builder().background(true).build())
            .build(),
    ).await?;

    // Stale-recovery loop: listStaleQueued(before)
    jobs.create_index(
        IndexModel::builder()
            .keys(doc! { "status": 1, "queuedAt": 1 })
            .options(IndexOptions::builder().background(true).build())
            .build(),
    ).await?;

    // BLOCK_ON_ERROR gating: listGroupsWithErrors(groups)
    jobs.create_index(
        IndexModel::builder()
            .keys(doc! { "messageGroup": 1, "status": 1 })
            .options(IndexOptions::builder()
                .sparse(true)
                .background(true)
                .build())
            .build(),
    ).await?;

    // TTL index - auto-delete dispatch jobs after 30 days
    jobs.create_index(
        IndexModel::builder()
            .keys(doc! { "createdAt": 1 })
            .options(IndexOptions::builder()
                .expire_after(std::time::Duration::from_secs(TTL_30_DAYS_SECONDS))
                .background(true)
                .build())
            .build(),
    ).await?;

    info!("Created indexes on dispatch_jobs");
    Ok(())
}

async fn create_dispatch_pool_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let pools = db.collection::<mongodb::bson::Document>("dispatch_pools");

    pools.create_index(
        IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .background(true)
                .build())
            .build(),
    ).await?;

    pools.create_index(
        IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().background(true).build())
            .build(),
    ).await?;

    info!("Created indexes on dispatch_pools");
    Ok(())
}

async fn create_service_account_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let accounts = db.collection::<mongodb::bson::Document>("service_accounts");

    accounts.create_index(
        IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .background(true)
                .build())
            .build(),
    ).await?;

    accounts.create_index(
        IndexModel::builder()
            .keys(doc! { "active": 1 })
            .options(IndexOptions::builder().background(true).build())
            .build(),
    ).await?;

    info!("Created indexes on service_accounts");
    Ok(())
}
