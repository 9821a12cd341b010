use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{BucketName, ObjectKey, VersionId};

/// Errors that can occur during storage operations
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Bucket does not exist
    BucketNotFound { bucket: BucketName },

    /// Bucket name already taken in the provider's namespace
    BucketAlreadyExists { bucket: BucketName },

    /// Bucket still holds objects or versions
    BucketNotEmpty { bucket: BucketName },

    /// Object not found, or its latest version is a delete marker
    ObjectNotFound { bucket: BucketName, key: ObjectKey },

    /// Version not found
    VersionNotFound {
        bucket: BucketName,
        key: ObjectKey,
        version_id: VersionId,
    },

    /// Access denied
    AccessDenied { resource: String, operation: String },

    /// Invalid storage class
    InvalidStorageClass { class: String },

    /// Request rejected as malformed by the provider
    InvalidRequest { message: String },

    /// Validation error
    ValidationError { message: String },

    /// Provider returned an error code with no dedicated variant
    ServiceError {
        operation: String,
        code: String,
        message: String,
    },

    /// Infrastructure error with external source
    InfrastructureError {
        message: String,
        source: Option<String>, // Store error as string to allow Clone
    },
}

impl StorageError {
    /// Stable name of the error category, used when a failure is only logged
    pub fn category(&self) -> &'static str {
        match self {
            StorageError::BucketNotFound { .. } => "BucketNotFound",
            StorageError::BucketAlreadyExists { .. } => "BucketAlreadyExists",
            StorageError::BucketNotEmpty { .. } => "BucketNotEmpty",
            StorageError::ObjectNotFound { .. } => "ObjectNotFound",
            StorageError::VersionNotFound { .. } => "VersionNotFound",
            StorageError::AccessDenied { .. } => "AccessDenied",
            StorageError::InvalidStorageClass { .. } => "InvalidStorageClass",
            StorageError::InvalidRequest { .. } => "InvalidRequest",
            StorageError::ValidationError { .. } => "ValidationError",
            StorageError::ServiceError { .. } => "ServiceError",
            StorageError::InfrastructureError { .. } => "InfrastructureError",
        }
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::BucketNotFound { bucket } => {
                write!(f, "Bucket not found: {}", bucket)
            }
            StorageError::BucketAlreadyExists { bucket } => {
                write!(f, "Bucket already exists: {}", bucket)
            }
            StorageError::BucketNotEmpty { bucket } => {
                write!(f, "Bucket is not empty: {}", bucket)
            }
            StorageError::ObjectNotFound { bucket, key } => {
                write!(f, "Object not found: {}/{}", bucket, key)
            }
            StorageError::VersionNotFound {
                bucket,
                key,
                version_id,
            } => {
                write!(
                    f,
                    "Version '{}' not found for object: {}/{}",
                    version_id, bucket, key
                )
            }
            StorageError::AccessDenied {
                resource,
                operation,
            } => {
                write!(
                    f,
                    "Access denied for operation '{}' on: {}",
                    operation, resource
                )
            }
            StorageError::InvalidStorageClass { class } => {
                write!(f, "Invalid storage class: {}", class)
            }
            StorageError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            StorageError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
            StorageError::ServiceError {
                operation,
                code,
                message,
            } => {
                write!(f, "{} failed with {}: {}", operation, code, message)
            }
            StorageError::InfrastructureError { message, .. } => {
                write!(f, "Infrastructure error: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<ValidationError> for StorageError {
    fn from(err: ValidationError) -> Self {
        StorageError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        let bucket = BucketName::new("demo-bucket").unwrap();
        let key = ObjectKey::new("file.txt").unwrap();

        assert_eq!(
            StorageError::BucketNotEmpty {
                bucket: bucket.clone()
            }
            .category(),
            "BucketNotEmpty"
        );
        assert_eq!(
            StorageError::ObjectNotFound { bucket, key }.category(),
            "ObjectNotFound"
        );
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: StorageError = ValidationError::EmptyObjectKey.into();
        assert_eq!(err.category(), "ValidationError");
        assert_eq!(
            err.to_string(),
            "Validation error: Object key cannot be empty"
        );
    }
}
