use crate::domain::{
    errors::StorageError,
    value_objects::{BucketName, ObjectKey, VersionId},
};
use thiserror::Error as ThisError;

/// Errors raised inside the storage adapters before they are mapped onto
/// [`StorageError`]
#[derive(ThisError, Debug)]
pub enum StoreError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Error response from the provider, identified by its error code
    #[error("{operation} failed: {code}: {message}")]
    Service {
        operation: String,
        code: String,
        message: String,
    },

    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The request never produced a service response
    #[error("Request failed: {0}")]
    Request(String),
}

impl StoreError {
    pub fn service(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Service {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Map onto the domain error, naming the resource the request addressed
    pub fn into_storage_error(self, target: &ErrorTarget<'_>) -> StorageError {
        match self {
            StoreError::Service {
                operation,
                code,
                message,
            } => map_service_code(target, operation, code, message),
            StoreError::ObjectStore(object_store::Error::NotFound { path, .. }) => {
                match target.key {
                    Some(key) => StorageError::ObjectNotFound {
                        bucket: target.bucket.clone(),
                        key: key.clone(),
                    },
                    None => StorageError::InfrastructureError {
                        message: format!("blob missing at {}", path),
                        source: None,
                    },
                }
            }
            StoreError::ObjectStore(err) => StorageError::InfrastructureError {
                message: "Object store operation failed".to_string(),
                source: Some(err.to_string()),
            },
            StoreError::Body(message) | StoreError::Request(message) => {
                StorageError::InfrastructureError {
                    message,
                    source: None,
                }
            }
        }
    }
}

/// Resource a failed request was addressing
#[derive(Debug, Clone, Copy)]
pub struct ErrorTarget<'a> {
    pub bucket: &'a BucketName,
    pub key: Option<&'a ObjectKey>,
    pub version_id: Option<&'a VersionId>,
}

impl<'a> ErrorTarget<'a> {
    pub fn bucket(bucket: &'a BucketName) -> Self {
        Self {
            bucket,
            key: None,
            version_id: None,
        }
    }

    pub fn object(bucket: &'a BucketName, key: &'a ObjectKey) -> Self {
        Self {
            bucket,
            key: Some(key),
            version_id: None,
        }
    }

    pub fn version(
        bucket: &'a BucketName,
        key: &'a ObjectKey,
        version_id: Option<&'a VersionId>,
    ) -> Self {
        Self {
            bucket,
            key: Some(key),
            version_id,
        }
    }
}

fn map_service_code(
    target: &ErrorTarget<'_>,
    operation: String,
    code: String,
    message: String,
) -> StorageError {
    let bucket = target.bucket.clone();
    match (code.as_str(), target.key, target.version_id) {
        ("NoSuchBucket", _, _) => StorageError::BucketNotFound { bucket },
        ("NoSuchVersion", Some(key), Some(version_id)) => StorageError::VersionNotFound {
            bucket,
            key: key.clone(),
            version_id: version_id.clone(),
        },
        ("NoSuchKey" | "NotFound" | "NoSuchVersion", Some(key), _) => {
            StorageError::ObjectNotFound {
                bucket,
                key: key.clone(),
            }
        }
        ("BucketAlreadyExists" | "BucketAlreadyOwnedByYou", _, _) => {
            StorageError::BucketAlreadyExists { bucket }
        }
        ("BucketNotEmpty", _, _) => StorageError::BucketNotEmpty { bucket },
        ("AccessDenied", _, _) => StorageError::AccessDenied {
            resource: match target.key {
                Some(key) => format!("{}/{}", bucket, key),
                None => bucket.to_string(),
            },
            operation,
        },
        ("InvalidStorageClass", _, _) => StorageError::InvalidStorageClass { class: message },
        ("MalformedXML" | "InvalidRequest" | "InvalidArgument" | "InvalidBucketName", _, _) => {
            StorageError::InvalidRequest {
                message: format!("{}: {}", code, message),
            }
        }
        _ => StorageError::ServiceError {
            operation,
            code,
            message,
        },
    }
}

/// Errors with no particular resource attached
impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Service {
                operation,
                code,
                message,
            } => StorageError::ServiceError {
                operation,
                code,
                message,
            },
            other => StorageError::InfrastructureError {
                message: "Storage request failed".to_string(),
                source: Some(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> BucketName {
        BucketName::new("error-test-bucket").unwrap()
    }

    #[test]
    fn test_service_codes_map_to_domain_errors() {
        let bucket = bucket();
        let key = ObjectKey::new("file.txt").unwrap();

        let err = StoreError::service("GetObject", "NoSuchKey", "gone")
            .into_storage_error(&ErrorTarget::object(&bucket, &key));
        assert_eq!(
            err,
            StorageError::ObjectNotFound {
                bucket: bucket.clone(),
                key: key.clone()
            }
        );

        let err = StoreError::service("HeadBucket", "NoSuchBucket", "gone")
            .into_storage_error(&ErrorTarget::bucket(&bucket));
        assert_eq!(err.category(), "BucketNotFound");

        let err = StoreError::service("DeleteBucket", "BucketNotEmpty", "not empty")
            .into_storage_error(&ErrorTarget::bucket(&bucket));
        assert_eq!(err.category(), "BucketNotEmpty");

        let err = StoreError::service("DeleteObjects", "MalformedXML", "empty")
            .into_storage_error(&ErrorTarget::bucket(&bucket));
        assert_eq!(err.category(), "InvalidRequest");
    }

    #[test]
    fn test_missing_version_needs_a_version_id() {
        let bucket = bucket();
        let key = ObjectKey::new("file.txt").unwrap();
        let version = VersionId::new("abc").unwrap();

        let err = StoreError::service("GetObject", "NoSuchVersion", "gone")
            .into_storage_error(&ErrorTarget::version(&bucket, &key, Some(&version)));
        assert_eq!(err.category(), "VersionNotFound");

        let err = StoreError::service("GetObject", "NoSuchVersion", "gone")
            .into_storage_error(&ErrorTarget::version(&bucket, &key, None));
        assert_eq!(err.category(), "ObjectNotFound");
    }

    #[test]
    fn test_unknown_code_is_kept() {
        let err = StoreError::service("PutObject", "SlowDown", "reduce rate")
            .into_storage_error(&ErrorTarget::bucket(&bucket()));
        assert_eq!(
            err,
            StorageError::ServiceError {
                operation: "PutObject".to_string(),
                code: "SlowDown".to_string(),
                message: "reduce rate".to_string(),
            }
        );
    }
}
