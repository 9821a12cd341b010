use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use object_store::{memory::InMemory, path::Path, ObjectStore, PutPayload};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapters::outbound::storage::error::{ErrorTarget, StoreError};
use crate::domain::{
    errors::{StorageError, StorageResult},
    models::{
        AccessControlList, BucketInfo, CannedAcl, DeleteObjectOutcome, DeleteObjectsOutcome,
        DeletedObject, ObjectHead, ObjectIdentifier, ObjectSummary, ObjectVersionDescriptor,
        Owner, PutObjectOptions, PutObjectOutcome, ServerSideEncryption, StorageClass,
        VersioningStatus, MAX_DELETE_BATCH,
    },
    value_objects::{BucketName, ObjectKey, VersionId},
};
use crate::ports::storage::StorageProvider;

pub const DEFAULT_REGION: &str = "us-east-1";

/// One stored revision of an object, or a delete marker
#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: VersionId,
    delete_marker: bool,
    size: u64,
    etag: Option<String>,
    last_modified: DateTime<Utc>,
    storage_class: StorageClass,
    server_side_encryption: Option<ServerSideEncryption>,
    content_type: Option<String>,
    acl: CannedAcl,
}

impl StoredVersion {
    fn marker(version_id: VersionId) -> Self {
        Self {
            version_id,
            delete_marker: true,
            size: 0,
            etag: None,
            last_modified: Utc::now(),
            storage_class: StorageClass::default(),
            server_side_encryption: None,
            content_type: None,
            acl: CannedAcl::default(),
        }
    }
}

#[derive(Debug)]
struct BucketState {
    created_at: DateTime<Utc>,
    region: String,
    versioning: VersioningStatus,
    /// Versions per key, oldest first
    objects: BTreeMap<ObjectKey, Vec<StoredVersion>>,
}

impl BucketState {
    fn latest(&self, key: &ObjectKey) -> Option<&StoredVersion> {
        self.objects
            .get(key)
            .and_then(|versions| versions.last())
            .filter(|version| !version.delete_marker)
    }

    fn latest_mut(&mut self, key: &ObjectKey) -> Option<&mut StoredVersion> {
        self.objects
            .get_mut(key)
            .and_then(|versions| versions.last_mut())
            .filter(|version| !version.delete_marker)
    }

    fn remove_version(&mut self, key: &ObjectKey, version_id: &VersionId) -> Option<StoredVersion> {
        let versions = self.objects.get_mut(key)?;
        let index = versions.iter().position(|v| &v.version_id == version_id)?;
        let removed = versions.remove(index);
        if versions.is_empty() {
            self.objects.remove(key);
        }
        Some(removed)
    }

    /// Add a revision, replacing the previous `null` version when the new
    /// one is also `null`. Returns the replaced revision.
    fn push_version(&mut self, key: &ObjectKey, version: StoredVersion) -> Option<StoredVersion> {
        let replaced = if version.version_id.is_null() {
            self.remove_version(key, &version.version_id)
        } else {
            None
        };
        self.objects.entry(key.clone()).or_default().push(version);
        replaced
    }

    /// Apply one delete the way the provider does for the bucket's
    /// versioning state. Returns the outcome and the revision whose data
    /// was dropped, if any.
    fn apply_delete(
        &mut self,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> (DeleteObjectOutcome, Option<StoredVersion>) {
        if let Some(version_id) = version_id {
            let removed = self.remove_version(key, version_id);
            let outcome = DeleteObjectOutcome {
                delete_marker: removed.as_ref().is_some_and(|v| v.delete_marker),
                version_id: Some(version_id.clone()),
            };
            return (outcome, removed);
        }

        match self.versioning {
            VersioningStatus::Unversioned => {
                let removed = self.remove_version(key, &VersionId::null());
                let outcome = DeleteObjectOutcome {
                    delete_marker: false,
                    version_id: None,
                };
                (outcome, removed)
            }
            VersioningStatus::Enabled => {
                let marker = VersionId::generate();
                self.push_version(key, StoredVersion::marker(marker.clone()));
                let outcome = DeleteObjectOutcome {
                    delete_marker: true,
                    version_id: Some(marker),
                };
                (outcome, None)
            }
            VersioningStatus::Suspended => {
                let removed = self.push_version(key, StoredVersion::marker(VersionId::null()));
                let outcome = DeleteObjectOutcome {
                    delete_marker: true,
                    version_id: Some(VersionId::null()),
                };
                (outcome, removed)
            }
        }
    }

    fn versioned(&self) -> bool {
        self.versioning != VersioningStatus::Unversioned
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    buckets: BTreeMap<BucketName, BucketState>,
}

impl ProviderState {
    fn bucket(&self, bucket: &BucketName) -> StorageResult<&BucketState> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.clone(),
            })
    }

    fn bucket_mut(&mut self, bucket: &BucketName) -> StorageResult<&mut BucketState> {
        self.buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.clone(),
            })
    }
}

/// A single-account object storage provider held in process memory.
///
/// Bucket, version and ACL bookkeeping lives in this adapter; object data is
/// written to an [`InMemory`] object store under `{bucket}/{key}.v_{version}`.
/// Versioning follows the provider rules: writes to an unversioned or
/// suspended bucket replace the `null` version, writes to an enabled bucket
/// add a new version, and deletes without a version id leave delete markers.
pub struct InMemoryStorageAdapter {
    blobs: Arc<dyn ObjectStore>,
    state: RwLock<ProviderState>,
    owner: Owner,
    region: String,
}

impl InMemoryStorageAdapter {
    pub fn new() -> Self {
        Self::with_region(DEFAULT_REGION)
    }

    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            blobs: Arc::new(InMemory::new()),
            state: RwLock::new(ProviderState::default()),
            owner: Owner {
                id: "in-memory-owner".to_string(),
                display_name: Some("walkthrough".to_string()),
            },
            region: region.into(),
        }
    }

    fn blob_path(bucket: &BucketName, key: &ObjectKey, version_id: &VersionId) -> Path {
        Path::from(format!("{}/{}.v_{}", bucket, key, version_id))
    }

    async fn drop_blob(&self, bucket: &BucketName, key: &ObjectKey, version: &StoredVersion) {
        if version.delete_marker {
            return;
        }
        let path = Self::blob_path(bucket, key, &version.version_id);
        if let Err(e) = self.blobs.delete(&path).await {
            debug!(%path, "blob already gone: {}", e);
        }
    }

    async fn read_blob(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: &VersionId,
    ) -> StorageResult<Bytes> {
        let target = ErrorTarget::version(bucket, key, Some(version_id));
        let path = Self::blob_path(bucket, key, version_id);
        let result = self
            .blobs
            .get(&path)
            .await
            .map_err(|e| StoreError::from(e).into_storage_error(&target))?;
        result
            .bytes()
            .await
            .map_err(|e| StoreError::from(e).into_storage_error(&target))
    }

    async fn snapshot_versions(
        &self,
        bucket: &BucketName,
    ) -> StorageResult<Vec<ObjectVersionDescriptor>> {
        let state = self.state.read().await;
        let entry = state.bucket(bucket)?;

        let mut descriptors = Vec::new();
        for (key, versions) in &entry.objects {
            let newest = versions.len() - 1;
            for (index, version) in versions.iter().enumerate().rev() {
                descriptors.push(ObjectVersionDescriptor {
                    key: key.clone(),
                    version_id: version.version_id.clone(),
                    is_latest: index == newest,
                    is_delete_marker: version.delete_marker,
                    last_modified: Some(version.last_modified),
                });
            }
        }
        Ok(descriptors)
    }
}

impl Default for InMemoryStorageAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(bucket: &BucketName, key: &ObjectKey) -> StorageError {
    StorageError::ObjectNotFound {
        bucket: bucket.clone(),
        key: key.clone(),
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorageAdapter {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_bucket(&self, bucket: &BucketName, region: Option<&str>) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.buckets.contains_key(bucket) {
            return Err(StorageError::BucketAlreadyExists {
                bucket: bucket.clone(),
            });
        }

        let region = region.unwrap_or(&self.region).to_string();
        debug!(%bucket, %region, "creating bucket");
        state.buckets.insert(
            bucket.clone(),
            BucketState {
                created_at: Utc::now(),
                region,
                versioning: VersioningStatus::Unversioned,
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &BucketName) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let entry = state.bucket(bucket)?;
        if !entry.objects.is_empty() {
            return Err(StorageError::BucketNotEmpty {
                bucket: bucket.clone(),
            });
        }
        debug!(%bucket, region = %entry.region, "deleting bucket");
        state.buckets.remove(bucket);
        Ok(())
    }

    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>> {
        let state = self.state.read().await;
        Ok(state
            .buckets
            .iter()
            .map(|(name, entry)| BucketInfo {
                name: name.clone(),
                created_at: Some(entry.created_at),
            })
            .collect())
    }

    async fn put_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        data: Bytes,
        options: &PutObjectOptions,
    ) -> StorageResult<PutObjectOutcome> {
        let mut state = self.state.write().await;
        let entry = state.bucket_mut(bucket)?;

        if let Some(StorageClass::Custom(class)) = &options.storage_class {
            return Err(StorageError::InvalidStorageClass {
                class: class.clone(),
            });
        }

        let version_id = match entry.versioning {
            VersioningStatus::Enabled => VersionId::generate(),
            VersioningStatus::Unversioned | VersioningStatus::Suspended => VersionId::null(),
        };
        let etag = format!("\"{:x}\"", md5::compute(&data));
        let size = data.len() as u64;

        self.blobs
            .put(
                &Self::blob_path(bucket, key, &version_id),
                PutPayload::from(data),
            )
            .await
            .map_err(|e| StoreError::from(e).into_storage_error(&ErrorTarget::object(bucket, key)))?;

        // The null blob was overwritten in place, so nothing to drop
        entry.push_version(
            key,
            StoredVersion {
                version_id: version_id.clone(),
                delete_marker: false,
                size,
                etag: Some(etag.clone()),
                last_modified: Utc::now(),
                storage_class: options.storage_class.clone().unwrap_or_default(),
                server_side_encryption: options.server_side_encryption,
                content_type: options.content_type.clone(),
                acl: options.acl.unwrap_or_default(),
            },
        );
        let versioned = entry.versioning == VersioningStatus::Enabled;
        debug!(%bucket, %key, %version_id, size, "stored object");

        Ok(PutObjectOutcome {
            etag: Some(etag),
            version_id: versioned.then_some(version_id),
        })
    }

    async fn get_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> StorageResult<Bytes> {
        let resolved = {
            let state = self.state.read().await;
            let entry = state.bucket(bucket)?;
            match version_id {
                Some(version_id) => {
                    let version = entry
                        .objects
                        .get(key)
                        .and_then(|versions| versions.iter().find(|v| &v.version_id == version_id))
                        .ok_or_else(|| StorageError::VersionNotFound {
                            bucket: bucket.clone(),
                            key: key.clone(),
                            version_id: version_id.clone(),
                        })?;
                    if version.delete_marker {
                        return Err(not_found(bucket, key));
                    }
                    version.version_id.clone()
                }
                None => entry
                    .latest(key)
                    .map(|version| version.version_id.clone())
                    .ok_or_else(|| not_found(bucket, key))?,
            }
        };

        self.read_blob(bucket, key, &resolved).await
    }

    async fn head_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<ObjectHead> {
        let state = self.state.read().await;
        let entry = state.bucket(bucket)?;
        let version = entry.latest(key).ok_or_else(|| not_found(bucket, key))?;

        Ok(ObjectHead {
            bucket: bucket.clone(),
            key: key.clone(),
            size: version.size,
            etag: version.etag.clone(),
            last_modified: Some(version.last_modified),
            storage_class: version.storage_class.clone(),
            server_side_encryption: version.server_side_encryption,
            version_id: entry.versioned().then(|| version.version_id.clone()),
            content_type: version.content_type.clone(),
            metadata: HashMap::new(),
        })
    }

    async fn copy_object(
        &self,
        source_bucket: &BucketName,
        source_key: &ObjectKey,
        destination_bucket: &BucketName,
        destination_key: &ObjectKey,
    ) -> StorageResult<PutObjectOutcome> {
        let head = self.head_object(source_bucket, source_key).await?;
        let data = self.get_object(source_bucket, source_key, None).await?;

        let options = PutObjectOptions {
            content_type: head.content_type,
            ..PutObjectOptions::default()
        };
        self.put_object(destination_bucket, destination_key, data, &options)
            .await
    }

    async fn delete_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version_id: Option<&VersionId>,
    ) -> StorageResult<DeleteObjectOutcome> {
        let mut state = self.state.write().await;
        let entry = state.bucket_mut(bucket)?;
        let (outcome, removed) = entry.apply_delete(key, version_id);
        drop(state);

        if let Some(removed) = removed {
            self.drop_blob(bucket, key, &removed).await;
        }
        Ok(outcome)
    }

    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
    ) -> StorageResult<DeleteObjectsOutcome> {
        if objects.is_empty() || objects.len() > MAX_DELETE_BATCH {
            return Err(StorageError::InvalidRequest {
                message: format!(
                    "MalformedXML: a delete request names 1 to {} objects, got {}",
                    MAX_DELETE_BATCH,
                    objects.len()
                ),
            });
        }

        let mut state = self.state.write().await;
        let entry = state.bucket_mut(bucket)?;

        let mut outcome = DeleteObjectsOutcome::default();
        let mut dropped = Vec::new();
        for object in objects {
            let (result, removed) = entry.apply_delete(&object.key, object.version_id.as_ref());
            outcome.deleted.push(DeletedObject {
                key: object.key.clone(),
                version_id: result.version_id,
                delete_marker: result.delete_marker,
            });
            if let Some(removed) = removed {
                dropped.push((object.key.clone(), removed));
            }
        }
        drop(state);

        for (key, version) in &dropped {
            self.drop_blob(bucket, key, version).await;
        }
        Ok(outcome)
    }

    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectSummary>> {
        let state = self.state.read().await;
        let entry = state.bucket(bucket)?;

        Ok(entry
            .objects
            .keys()
            .filter(|key| prefix.map_or(true, |p| key.as_str().starts_with(p)))
            .filter_map(|key| {
                entry.latest(key).map(|version| ObjectSummary {
                    key: key.clone(),
                    size: version.size,
                    etag: version.etag.clone(),
                    last_modified: Some(version.last_modified),
                    storage_class: version.storage_class.clone(),
                })
            })
            .collect())
    }

    fn list_object_versions<'a>(
        &'a self,
        bucket: &'a BucketName,
    ) -> BoxStream<'a, StorageResult<ObjectVersionDescriptor>> {
        stream::once(self.snapshot_versions(bucket))
            .map_ok(|versions| stream::iter(versions.into_iter().map(Ok::<_, StorageError>)))
            .try_flatten()
            .boxed()
    }

    async fn get_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> StorageResult<AccessControlList> {
        let state = self.state.read().await;
        let version = state
            .bucket(bucket)?
            .latest(key)
            .ok_or_else(|| not_found(bucket, key))?;
        Ok(AccessControlList::from_canned(self.owner.clone(), version.acl))
    }

    async fn put_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        acl: CannedAcl,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let version = state
            .bucket_mut(bucket)?
            .latest_mut(key)
            .ok_or_else(|| not_found(bucket, key))?;
        version.acl = acl;
        Ok(())
    }

    async fn get_bucket_versioning(&self, bucket: &BucketName) -> StorageResult<VersioningStatus> {
        let state = self.state.read().await;
        Ok(state.bucket(bucket)?.versioning)
    }

    async fn put_bucket_versioning(&self, bucket: &BucketName, enabled: bool) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let entry = state.bucket_mut(bucket)?;
        entry.versioning = if enabled {
            VersioningStatus::Enabled
        } else {
            VersioningStatus::Suspended
        };
        Ok(())
    }
}
