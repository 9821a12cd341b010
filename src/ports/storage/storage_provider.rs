use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::{
    errors::StorageResult,
    models::{
        AccessControlList, BucketInfo, CannedAcl, DeleteObjectOutcome, DeleteObjectsOutcome,
        ObjectHead, ObjectIdentifier, ObjectSummary, ObjectVersionDescriptor, PutObjectOptions,
        PutObjectOutcome, VersioningStatus,
    },
    value_objects::{BucketName, ObjectKey, VersionId},
};

/// Port for an object-storage provider.
///
/// An explicitly constructed client: whoever drives the storage owns one and
/// passes it to every operation. Each call maps to one provider request
/// (except `list_object_versions`, which follows continuation markers as the
/// stream is consumed).
#[async_trait]
pub trait StorageProvider: Send + Sync + 'static {
    /// Region new buckets are created in when none is given
    fn region(&self) -> &str;

    /// Create a bucket; `region` overrides the client's region
    async fn create_bucket(&self, bucket: &BucketName, region: Option<&str>) -> StorageResult<()>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket: &BucketName) -> StorageResult<()>;

    /// List all buckets owned by the caller
    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>>;

    /// Store object data
    async fn put_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        data: Bytes,
        options: &PutObjectOptions,
    ) -> StorageResult<PutObjectOutcome>;

    /// Retrieve object data, the latest version unless `version_id` is given
    async fn get_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> StorageResult<Bytes>;

    /// Fetch metadata of the latest version
    async fn head_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<ObjectHead>;

    /// Server-side copy of the latest version of an object
    async fn copy_object(
        &self,
        source_bucket: &BucketName,
        source_key: &ObjectKey,
        destination_bucket: &BucketName,
        destination_key: &ObjectKey,
    ) -> StorageResult<PutObjectOutcome>;

    /// Delete an object, or one version of it.
    ///
    /// Without a version id on a versioned bucket this creates a delete marker.
    async fn delete_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> StorageResult<DeleteObjectOutcome>;

    /// Batch delete. Items succeed or fail independently; the provider
    /// rejects an empty request and more than `MAX_DELETE_BATCH` items.
    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
    ) -> StorageResult<DeleteObjectsOutcome>;

    /// List latest versions of the objects in a bucket
    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectSummary>>;

    /// Lazily list every version and delete marker in a bucket
    fn list_object_versions<'a>(
        &'a self,
        bucket: &'a BucketName,
    ) -> BoxStream<'a, StorageResult<ObjectVersionDescriptor>>;

    /// Read the grant list of the latest version
    async fn get_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> StorageResult<AccessControlList>;

    /// Replace the grant list of the latest version with a canned ACL
    async fn put_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        acl: CannedAcl,
    ) -> StorageResult<()>;

    async fn get_bucket_versioning(&self, bucket: &BucketName) -> StorageResult<VersioningStatus>;

    /// Enable versioning, or suspend it when `enabled` is false
    async fn put_bucket_versioning(&self, bucket: &BucketName, enabled: bool) -> StorageResult<()>;
}
