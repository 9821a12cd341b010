use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bucket_walkthrough::{
    domain::models::{
        AccessControlList, BucketInfo, CannedAcl, DeleteObjectOutcome, DeleteObjectsOutcome,
        ObjectHead, ObjectIdentifier, ObjectSummary, ObjectVersionDescriptor, PutObjectOptions,
        PutObjectOutcome, VersioningStatus,
    },
    BucketName, CleanupService, CleanupServiceImpl, InMemoryStorageAdapter, ObjectKey,
    StorageProvider, StorageResult, VersionId,
};

/// Wraps the in-memory provider and records every batch delete request
struct RecordingProvider {
    inner: InMemoryStorageAdapter,
    batch_sizes: Mutex<Vec<usize>>,
    version_listings: AtomicUsize,
}

impl RecordingProvider {
    fn new() -> Self {
        Self {
            inner: InMemoryStorageAdapter::new(),
            batch_sizes: Mutex::new(Vec::new()),
            version_listings: AtomicUsize::new(0),
        }
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageProvider for RecordingProvider {
    fn region(&self) -> &str {
        self.inner.region()
    }

    async fn create_bucket(&self, bucket: &BucketName, region: Option<&str>) -> StorageResult<()> {
        self.inner.create_bucket(bucket, region).await
    }

    async fn delete_bucket(&self, bucket: &BucketName) -> StorageResult<()> {
        self.inner.delete_bucket(bucket).await
    }

    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>> {
        self.inner.list_buckets().await
    }

    async fn put_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        data: Bytes,
        options: &PutObjectOptions,
    ) -> StorageResult<PutObjectOutcome> {
        self.inner.put_object(bucket, key, data, options).await
    }

    async fn get_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> StorageResult<Bytes> {
        self.inner.get_object(bucket, key, version_id).await
    }

    async fn head_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<ObjectHead> {
        self.inner.head_object(bucket, key).await
    }

    async fn copy_object(
        &self,
        source_bucket: &BucketName,
        source_key: &ObjectKey,
        destination_bucket: &BucketName,
        destination_key: &ObjectKey,
    ) -> StorageResult<PutObjectOutcome> {
        self.inner
            .copy_object(source_bucket, source_key, destination_bucket, destination_key)
            .await
    }

    async fn delete_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> StorageResult<DeleteObjectOutcome> {
        self.inner.delete_object(bucket, key, version_id).await
    }

    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
    ) -> StorageResult<DeleteObjectsOutcome> {
        self.batch_sizes.lock().unwrap().push(objects.len());
        self.inner.delete_objects(bucket, objects).await
    }

    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectSummary>> {
        self.inner.list_objects(bucket, prefix).await
    }

    fn list_object_versions<'a>(
        &'a self,
        bucket: &'a BucketName,
    ) -> BoxStream<'a, StorageResult<ObjectVersionDescriptor>> {
        self.version_listings.fetch_add(1, Ordering::SeqCst);
        self.inner.list_object_versions(bucket)
    }

    async fn get_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> StorageResult<AccessControlList> {
        self.inner.get_object_acl(bucket, key).await
    }

    async fn put_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        acl: CannedAcl,
    ) -> StorageResult<()> {
        self.inner.put_object_acl(bucket, key, acl).await
    }

    async fn get_bucket_versioning(&self, bucket: &BucketName) -> StorageResult<VersioningStatus> {
        self.inner.get_bucket_versioning(bucket).await
    }

    async fn put_bucket_versioning(&self, bucket: &BucketName, enabled: bool) -> StorageResult<()> {
        self.inner.put_bucket_versioning(bucket, enabled).await
    }
}

async fn setup() -> (Arc<RecordingProvider>, CleanupServiceImpl, BucketName) {
    let provider = Arc::new(RecordingProvider::new());
    let service = CleanupServiceImpl::new(provider.clone());
    let bucket = BucketName::generate("cleanup-").unwrap();
    provider.create_bucket(&bucket, None).await.unwrap();
    (provider, service, bucket)
}

#[tokio::test]
async fn test_purge_issues_one_batch_for_every_version() {
    let (provider, service, bucket) = setup().await;
    provider.put_bucket_versioning(&bucket, true).await.unwrap();

    let objects = 4;
    let versions = 3;
    for n in 0..objects {
        let key = ObjectKey::new(format!("object-{}.txt", n)).unwrap();
        for v in 0..versions {
            provider
                .put_object(
                    &bucket,
                    &key,
                    Bytes::from(format!("{} {}", n, v)),
                    &PutObjectOptions::default(),
                )
                .await
                .unwrap();
        }
    }

    let report = service.purge_bucket(&bucket).await.unwrap();

    assert_eq!(provider.batch_sizes(), vec![objects * versions]);
    assert_eq!(report.listed, objects * versions);
    assert!(report.is_complete());

    let remaining: Vec<_> = provider
        .list_object_versions(&bucket)
        .try_collect()
        .await
        .unwrap();
    assert!(remaining.is_empty());
    provider.delete_bucket(&bucket).await.unwrap();
}

#[tokio::test]
async fn test_purge_of_empty_bucket_sends_no_batch() {
    let (provider, service, bucket) = setup().await;

    let report = service.purge_bucket(&bucket).await.unwrap();

    assert!(provider.batch_sizes().is_empty());
    assert_eq!(provider.version_listings.load(Ordering::SeqCst), 1);
    assert_eq!(report.listed, 0);
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_purge_removes_delete_markers_and_null_versions() {
    let (provider, service, bucket) = setup().await;
    let key = ObjectKey::new("mixed.txt").unwrap();

    // null version written before versioning was enabled
    provider
        .put_object(&bucket, &key, Bytes::from("null"), &PutObjectOptions::default())
        .await
        .unwrap();
    provider.put_bucket_versioning(&bucket, true).await.unwrap();
    provider
        .put_object(&bucket, &key, Bytes::from("v1"), &PutObjectOptions::default())
        .await
        .unwrap();
    provider.delete_object(&bucket, &key, None).await.unwrap();

    let listed: Vec<ObjectVersionDescriptor> = provider
        .list_object_versions(&bucket)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().any(|v| v.version_id.is_null()));
    assert!(listed.iter().any(|v| v.is_delete_marker && v.is_latest));

    // Versions remain behind the delete marker
    let err = provider.delete_bucket(&bucket).await.unwrap_err();
    assert_eq!(err.category(), "BucketNotEmpty");

    let report = service.purge_and_delete_bucket(&bucket).await.unwrap();
    assert_eq!(report.deleted.len(), 3);
    assert!(provider.list_buckets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_large_purge_is_split_into_provider_sized_batches() {
    let (provider, service, bucket) = setup().await;

    for n in 0..1001 {
        let key = ObjectKey::new(format!("many/{:04}.txt", n)).unwrap();
        provider
            .put_object(&bucket, &key, Bytes::from("x"), &PutObjectOptions::default())
            .await
            .unwrap();
    }

    let report = service.purge_bucket(&bucket).await.unwrap();

    assert_eq!(provider.batch_sizes(), vec![1000, 1]);
    assert_eq!(report.batches, 2);
    assert_eq!(report.deleted.len(), 1001);
}
