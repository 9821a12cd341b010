use async_trait::async_trait;
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        errors::StorageResult,
        models::{ObjectIdentifier, PurgeReport, MAX_DELETE_BATCH},
        value_objects::BucketName,
    },
    ports::{services::CleanupService, storage::StorageProvider},
};

/// Empties buckets by deleting every version and delete marker they hold.
///
/// Deleting by key alone only stacks delete markers on a versioned bucket,
/// so every `(key, version id)` pair from the version listing goes into the
/// batch delete.
#[derive(Clone)]
pub struct CleanupServiceImpl {
    provider: Arc<dyn StorageProvider>,
}

impl CleanupServiceImpl {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    async fn collect_identifiers(
        &self,
        bucket: &BucketName,
    ) -> StorageResult<Vec<ObjectIdentifier>> {
        self.provider
            .list_object_versions(bucket)
            .map_ok(|version| version.identifier())
            .try_collect()
            .await
    }
}

#[async_trait]
impl CleanupService for CleanupServiceImpl {
    async fn purge_bucket(&self, bucket: &BucketName) -> StorageResult<PurgeReport> {
        let identifiers = self.collect_identifiers(bucket).await?;

        // The provider rejects an empty delete request
        if identifiers.is_empty() {
            debug!(%bucket, "bucket holds no versions, skipping batch delete");
            return Ok(PurgeReport::empty(bucket.clone()));
        }

        let mut report = PurgeReport {
            listed: identifiers.len(),
            ..PurgeReport::empty(bucket.clone())
        };

        for batch in identifiers.chunks(MAX_DELETE_BATCH) {
            let outcome = self.provider.delete_objects(bucket, batch).await?;
            report.batches += 1;
            report.deleted.extend(outcome.deleted);
            report.failures.extend(outcome.errors);
        }

        if !report.is_complete() {
            warn!(
                %bucket,
                failed = report.failures.len(),
                "some versions could not be deleted"
            );
        }

        info!(
            %bucket,
            listed = report.listed,
            deleted = report.deleted.len(),
            batches = report.batches,
            "purged bucket"
        );

        Ok(report)
    }

    async fn purge_and_delete_bucket(&self, bucket: &BucketName) -> StorageResult<PurgeReport> {
        let report = self.purge_bucket(bucket).await?;
        self.provider.delete_bucket(bucket).await?;
        info!(%bucket, "deleted bucket");
        Ok(report)
    }
}
