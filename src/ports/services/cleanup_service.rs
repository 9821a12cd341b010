use crate::domain::{errors::StorageResult, models::PurgeReport, value_objects::BucketName};
use async_trait::async_trait;

/// Port for removing everything a bucket holds
#[async_trait]
pub trait CleanupService: Send + Sync + 'static {
    /// Delete every object version and delete marker in the bucket
    async fn purge_bucket(&self, bucket: &BucketName) -> StorageResult<PurgeReport>;

    /// Purge the bucket, then delete it
    async fn purge_and_delete_bucket(&self, bucket: &BucketName) -> StorageResult<PurgeReport>;
}
