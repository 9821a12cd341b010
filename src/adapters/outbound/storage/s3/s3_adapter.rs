use async_trait::async_trait;
use aws_sdk_s3::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::{ByteStream, DateTime as SdkDateTime},
    types::{
        self as s3, BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration,
        Delete, ObjectCannedAcl, VersioningConfiguration,
    },
    Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::adapters::outbound::storage::error::{ErrorTarget, StoreError};
use crate::domain::{
    errors::{StorageError, StorageResult},
    models::{
        AccessControlList, BucketInfo, CannedAcl, DeleteFailure, DeleteObjectOutcome,
        DeleteObjectsOutcome, DeletedObject, Grant, Grantee, ObjectHead, ObjectIdentifier,
        ObjectSummary, ObjectVersionDescriptor, Owner, Permission, PutObjectOptions,
        PutObjectOutcome, ServerSideEncryption, StorageClass, VersioningStatus,
    },
    value_objects::{BucketName, ObjectKey, VersionId, NULL_VERSION},
};
use crate::ports::storage::StorageProvider;

/// Region whose buckets are created without a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// Storage provider talking to S3 through an explicitly constructed client
#[derive(Clone)]
pub struct S3StorageAdapter {
    client: Client,
    region: String,
}

impl S3StorageAdapter {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

/// Turn an SDK failure into a [`StoreError`] carrying the S3 error code
fn service_error<E>(operation: &str, err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let Some(code) = err.code() {
        return StoreError::service(operation, code, err.message().unwrap_or_default());
    }

    // HEAD responses carry no error body
    if let Some(response) = err.raw_response() {
        if response.status().as_u16() == 404 {
            return StoreError::service(operation, "NotFound", "resource not found");
        }
    }

    StoreError::Request(DisplayErrorContext(&err).to_string())
}

fn to_chrono(time: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

fn version_id(value: Option<&str>) -> StorageResult<Option<VersionId>> {
    Ok(value.map(VersionId::new).transpose()?)
}

fn grantee(grantee: &s3::Grantee) -> Grantee {
    if let Some(uri) = grantee.uri() {
        Grantee::Group {
            uri: uri.to_string(),
        }
    } else if let Some(address) = grantee.email_address() {
        Grantee::Email {
            address: address.to_string(),
        }
    } else {
        Grantee::CanonicalUser {
            id: grantee.id().unwrap_or_default().to_string(),
            display_name: grantee.display_name().map(String::from),
        }
    }
}

#[derive(Debug, Default)]
struct VersionMarkers {
    key: Option<String>,
    version_id: Option<String>,
}

fn page_descriptors(
    page: &aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput,
) -> StorageResult<Vec<ObjectVersionDescriptor>> {
    let versions = page.versions().iter().map(|v| {
        (
            v.key(),
            v.version_id(),
            v.is_latest(),
            false,
            v.last_modified(),
        )
    });
    let markers = page.delete_markers().iter().map(|m| {
        (
            m.key(),
            m.version_id(),
            m.is_latest(),
            true,
            m.last_modified(),
        )
    });

    let mut descriptors = versions
        .chain(markers)
        .map(|(key, version, latest, marker, modified)| {
            Ok(ObjectVersionDescriptor {
                key: ObjectKey::from_provider(key.unwrap_or_default())?,
                version_id: VersionId::new(version.unwrap_or(NULL_VERSION))?,
                is_latest: latest.unwrap_or(false),
                is_delete_marker: marker,
                last_modified: modified.and_then(to_chrono),
            })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    descriptors.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(descriptors)
}

#[async_trait]
impl StorageProvider for S3StorageAdapter {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_bucket(&self, bucket: &BucketName, region: Option<&str>) -> StorageResult<()> {
        let region = region.unwrap_or(&self.region);
        let mut request = self.client.create_bucket().bucket(bucket.as_str());

        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request.send().await.map_err(|e| {
            service_error("CreateBucket", e).into_storage_error(&ErrorTarget::bucket(bucket))
        })?;
        debug!(%bucket, %region, "created bucket");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &BucketName) -> StorageResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket.as_str())
            .send()
            .await
            .map_err(|e| {
                service_error("DeleteBucket", e).into_storage_error(&ErrorTarget::bucket(bucket))
            })?;
        Ok(())
    }

    async fn list_buckets(&self) -> StorageResult<Vec<BucketInfo>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::from(service_error("ListBuckets", e)))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| {
                let name = bucket.name()?;
                match BucketName::new(name) {
                    Ok(name) => Some(BucketInfo {
                        name,
                        created_at: bucket.creation_date().and_then(to_chrono),
                    }),
                    Err(e) => {
                        // Legacy names predating the current naming rules
                        warn!(bucket = name, "skipping bucket: {}", e);
                        None
                    }
                }
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
        let output = self
            .client
            .put_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .body(ByteStream::from(data))
            .set_acl(options.acl.map(|acl| ObjectCannedAcl::from(acl.as_str())))
            .set_server_side_encryption(
                options
                    .server_side_encryption
                    .map(|sse| s3::ServerSideEncryption::from(sse.as_str())),
            )
            .set_storage_class(
                options
                    .storage_class
                    .as_ref()
                    .map(|class| s3::StorageClass::from(class.as_str())),
            )
            .set_content_type(options.content_type.clone())
            .send()
            .await
            .map_err(|e| {
                service_error("PutObject", e).into_storage_error(&ErrorTarget::object(bucket, key))
            })?;

        Ok(PutObjectOutcome {
            etag: output.e_tag().map(String::from),
            version_id: version_id(output.version_id())?,
        })
    }

    async fn get_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version: Option<&VersionId>,
    ) -> StorageResult<Bytes> {
        let target = ErrorTarget::version(bucket, key, version);
        let output = self
            .client
            .get_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .set_version_id(version.map(|v| v.to_string()))
            .send()
            .await
            .map_err(|e| service_error("GetObject", e).into_storage_error(&target))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Body(e.to_string()).into_storage_error(&target))?;
        Ok(body.into_bytes())
    }

    async fn head_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<ObjectHead> {
        let output = self
            .client
            .head_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .send()
            .await
            .map_err(|e| {
                service_error("HeadObject", e).into_storage_error(&ErrorTarget::object(bucket, key))
            })?;

        let server_side_encryption = output
            .server_side_encryption()
            .and_then(|sse| sse.as_str().parse::<ServerSideEncryption>().ok());

        Ok(ObjectHead {
            bucket: bucket.clone(),
            key: key.clone(),
            size: output.content_length().unwrap_or_default().max(0) as u64,
            etag: output.e_tag().map(String::from),
            last_modified: output.last_modified().and_then(to_chrono),
            // S3 omits the header for STANDARD
            storage_class: output
                .storage_class()
                .map(|class| StorageClass::from(class.as_str()))
                .unwrap_or_default(),
            server_side_encryption,
            version_id: version_id(output.version_id())?,
            content_type: output.content_type().map(String::from),
            metadata: output.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn copy_object(
        &self,
        source_bucket: &BucketName,
        source_key: &ObjectKey,
        destination_bucket: &BucketName,
        destination_key: &ObjectKey,
    ) -> StorageResult<PutObjectOutcome> {
        let copy_source = format!(
            "{}/{}",
            source_bucket,
            urlencoding::encode(source_key.as_str())
        );

        let output = self
            .client
            .copy_object()
            .copy_source(copy_source)
            .bucket(destination_bucket.as_str())
            .key(destination_key.as_str())
            .send()
            .await
            .map_err(|e| {
                service_error("CopyObject", e)
                    .into_storage_error(&ErrorTarget::object(source_bucket, source_key))
            })?;

        Ok(PutObjectOutcome {
            etag: output
                .copy_object_result()
                .and_then(|result| result.e_tag())
                .map(String::from),
            version_id: version_id(output.version_id())?,
        })
    }

    async fn delete_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        version: Option<&VersionId>,
    ) -> StorageResult<DeleteObjectOutcome> {
        let output = self
            .client
            .delete_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .set_version_id(version.map(|v| v.to_string()))
            .send()
            .await
            .map_err(|e| {
                service_error("DeleteObject", e)
                    .into_storage_error(&ErrorTarget::version(bucket, key, version))
            })?;

        Ok(DeleteObjectOutcome {
            delete_marker: output.delete_marker().unwrap_or(false),
            version_id: version_id(output.version_id())?,
        })
    }

    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
    ) -> StorageResult<DeleteObjectsOutcome> {
        let target = ErrorTarget::bucket(bucket);
        let identifiers = objects
            .iter()
            .map(|object| {
                s3::ObjectIdentifier::builder()
                    .key(object.key.as_str())
                    .set_version_id(object.version_id.as_ref().map(|v| v.to_string()))
                    .build()
                    .map_err(|e| StoreError::Request(e.to_string()).into_storage_error(&target))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(false)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()).into_storage_error(&target))?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket.as_str())
            .delete(delete)
            .send()
            .await
            .map_err(|e| service_error("DeleteObjects", e).into_storage_error(&target))?;

        let mut outcome = DeleteObjectsOutcome::default();
        for deleted in output.deleted() {
            outcome.deleted.push(DeletedObject {
                key: ObjectKey::from_provider(deleted.key().unwrap_or_default())?,
                version_id: version_id(deleted.version_id())?,
                delete_marker: deleted.delete_marker().unwrap_or(false),
            });
        }
        for failure in output.errors() {
            outcome.errors.push(DeleteFailure {
                key: ObjectKey::from_provider(failure.key().unwrap_or_default())?,
                version_id: version_id(failure.version_id())?,
                code: failure.code().unwrap_or("Unknown").to_string(),
                message: failure.message().unwrap_or_default().to_string(),
            });
        }
        Ok(outcome)
    }

    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<ObjectSummary>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket.as_str())
            .set_prefix(prefix.map(String::from))
            .into_paginator()
            .send();

        let mut summaries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                service_error("ListObjectsV2", e).into_storage_error(&ErrorTarget::bucket(bucket))
            })?;
            for object in page.contents() {
                summaries.push(ObjectSummary {
                    key: ObjectKey::from_provider(object.key().unwrap_or_default())?,
                    size: object.size().unwrap_or_default().max(0) as u64,
                    etag: object.e_tag().map(String::from),
                    last_modified: object.last_modified().and_then(to_chrono),
                    storage_class: object
                        .storage_class()
                        .map(|class| StorageClass::from(class.as_str()))
                        .unwrap_or_default(),
                });
            }
        }
        Ok(summaries)
    }

    fn list_object_versions<'a>(
        &'a self,
        bucket: &'a BucketName,
    ) -> BoxStream<'a, StorageResult<ObjectVersionDescriptor>> {
        let pages = stream::try_unfold(Some(VersionMarkers::default()), move |markers| async move {
            let Some(markers) = markers else {
                return Ok::<_, StorageError>(None);
            };

            let page = self
                .client
                .list_object_versions()
                .bucket(bucket.as_str())
                .set_key_marker(markers.key)
                .set_version_id_marker(markers.version_id)
                .send()
                .await
                .map_err(|e| {
                    service_error("ListObjectVersions", e)
                        .into_storage_error(&ErrorTarget::bucket(bucket))
                })?;

            let next = VersionMarkers {
                key: page.next_key_marker().map(String::from),
                version_id: page.next_version_id_marker().map(String::from),
            };
            let more = page.is_truncated().unwrap_or(false)
                && (next.key.is_some() || next.version_id.is_some());

            let descriptors = page_descriptors(&page)?;
            debug!(%bucket, count = descriptors.len(), more, "listed version page");
            Ok::<_, StorageError>(Some((descriptors, more.then_some(next))))
        });

        pages
            .map_ok(|descriptors| stream::iter(descriptors.into_iter().map(Ok::<_, StorageError>)))
            .try_flatten()
            .boxed()
    }

    async fn get_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> StorageResult<AccessControlList> {
        let output = self
            .client
            .get_object_acl()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .send()
            .await
            .map_err(|e| {
                service_error("GetObjectAcl", e)
                    .into_storage_error(&ErrorTarget::object(bucket, key))
            })?;

        let owner = output.owner().map(|owner| Owner {
            id: owner.id().unwrap_or_default().to_string(),
            display_name: owner.display_name().map(String::from),
        });

        let mut grants = Vec::new();
        for grant in output.grants() {
            let (Some(who), Some(permission)) = (grant.grantee(), grant.permission()) else {
                continue;
            };
            grants.push(Grant {
                grantee: grantee(who),
                permission: permission.as_str().parse::<Permission>()?,
            });
        }

        Ok(AccessControlList { owner, grants })
    }

    async fn put_object_acl(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        acl: CannedAcl,
    ) -> StorageResult<()> {
        self.client
            .put_object_acl()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| {
                service_error("PutObjectAcl", e)
                    .into_storage_error(&ErrorTarget::object(bucket, key))
            })?;
        Ok(())
    }

    async fn get_bucket_versioning(&self, bucket: &BucketName) -> StorageResult<VersioningStatus> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(bucket.as_str())
            .send()
            .await
            .map_err(|e| {
                service_error("GetBucketVersioning", e)
                    .into_storage_error(&ErrorTarget::bucket(bucket))
            })?;

        Ok(match output.status() {
            Some(BucketVersioningStatus::Enabled) => VersioningStatus::Enabled,
            Some(BucketVersioningStatus::Suspended) => VersioningStatus::Suspended,
            _ => VersioningStatus::Unversioned,
        })
    }

    async fn put_bucket_versioning(&self, bucket: &BucketName, enabled: bool) -> StorageResult<()> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };

        self.client
            .put_bucket_versioning()
            .bucket(bucket.as_str())
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| {
                service_error("PutBucketVersioning", e)
                    .into_storage_error(&ErrorTarget::bucket(bucket))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
    use aws_sdk_s3::types::{DeleteMarkerEntry, ObjectVersion};

    fn version(key: &str, version_id: &str) -> ObjectVersion {
        ObjectVersion::builder()
            .key(key)
            .version_id(version_id)
            .is_latest(true)
            .build()
    }

    #[test]
    fn test_page_keeps_keys_the_provider_allows() {
        let page = ListObjectVersionsOutput::builder()
            .versions(version("ok.txt", "v1"))
            .versions(version("/leading-slash.txt", "v2"))
            .versions(version("logs//x.txt", "v3"))
            .delete_markers(
                DeleteMarkerEntry::builder()
                    .key("/leading-slash.txt")
                    .version_id("null")
                    .is_latest(false)
                    .build(),
            )
            .build();

        let descriptors = page_descriptors(&page).unwrap();
        let keys: Vec<&str> = descriptors.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["/leading-slash.txt", "/leading-slash.txt", "logs//x.txt", "ok.txt"]
        );

        let marker = descriptors.iter().find(|d| d.is_delete_marker).unwrap();
        assert!(marker.version_id.is_null());
        assert!(!marker.is_latest);
    }

    #[test]
    fn test_page_without_version_id_lists_null_version() {
        let page = ListObjectVersionsOutput::builder()
            .versions(ObjectVersion::builder().key("plain.txt").build())
            .build();

        let descriptors = page_descriptors(&page).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert!(descriptors[0].version_id.is_null());
        assert!(!descriptors[0].is_latest);
    }
}
