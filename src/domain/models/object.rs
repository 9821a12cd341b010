use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{BucketName, ObjectKey, VersionId};

/// Canned access control lists an object can be written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CannedAcl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl FromStr for CannedAcl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(CannedAcl::Private),
            "public-read" => Ok(CannedAcl::PublicRead),
            "public-read-write" => Ok(CannedAcl::PublicReadWrite),
            "authenticated-read" => Ok(CannedAcl::AuthenticatedRead),
            "bucket-owner-read" => Ok(CannedAcl::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(CannedAcl::BucketOwnerFullControl),
            other => Err(ValidationError::InvalidField {
                field: "acl".to_string(),
                value: other.to_string(),
                expected: "a canned ACL such as 'private' or 'public-read'".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side encryption algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSideEncryption {
    Aes256,
    AwsKms,
}

impl ServerSideEncryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerSideEncryption::Aes256 => "AES256",
            ServerSideEncryption::AwsKms => "aws:kms",
        }
    }
}

impl FromStr for ServerSideEncryption {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES256" => Ok(ServerSideEncryption::Aes256),
            "aws:kms" => Ok(ServerSideEncryption::AwsKms),
            other => Err(ValidationError::InvalidField {
                field: "server_side_encryption".to_string(),
                value: other.to_string(),
                expected: "AES256 or aws:kms".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ServerSideEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage classes offered by the provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    Standard,
    StandardIa,
    OnezoneIa,
    IntelligentTiering,
    Glacier,
    DeepArchive,
    ReducedRedundancy,
    Custom(String),
}

impl StorageClass {
    pub fn as_str(&self) -> &str {
        match self {
            StorageClass::Standard => "STANDARD",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::Glacier => "GLACIER",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::Custom(s) => s,
        }
    }
}

impl From<&str> for StorageClass {
    fn from(s: &str) -> Self {
        match s {
            "STANDARD" => StorageClass::Standard,
            "STANDARD_IA" => StorageClass::StandardIa,
            "ONEZONE_IA" => StorageClass::OnezoneIa,
            "INTELLIGENT_TIERING" => StorageClass::IntelligentTiering,
            "GLACIER" => StorageClass::Glacier,
            "DEEP_ARCHIVE" => StorageClass::DeepArchive,
            "REDUCED_REDUNDANCY" => StorageClass::ReducedRedundancy,
            other => StorageClass::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for StorageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options applied when writing an object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutObjectOptions {
    pub acl: Option<CannedAcl>,
    pub server_side_encryption: Option<ServerSideEncryption>,
    pub storage_class: Option<StorageClass>,
    pub content_type: Option<String>,
}

impl PutObjectOptions {
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn with_encryption(mut self, sse: ServerSideEncryption) -> Self {
        self.server_side_encryption = Some(sse);
        self
    }

    pub fn with_storage_class(mut self, class: StorageClass) -> Self {
        self.storage_class = Some(class);
        self
    }
}

/// Result of a successful put or copy
#[derive(Debug, Clone, PartialEq)]
pub struct PutObjectOutcome {
    pub etag: Option<String>,
    /// Only present when the bucket has versioning enabled
    pub version_id: Option<VersionId>,
}

/// Object metadata returned by a head request
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHead {
    pub bucket: BucketName,
    pub key: ObjectKey,
    pub size: u64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub storage_class: StorageClass,
    pub server_side_encryption: Option<ServerSideEncryption>,
    pub version_id: Option<VersionId>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// One entry of an object listing (latest versions only)
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: ObjectKey,
    pub size: u64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub storage_class: StorageClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_acl_parsing() {
        assert_eq!("public-read".parse::<CannedAcl>(), Ok(CannedAcl::PublicRead));
        assert_eq!("private".parse::<CannedAcl>(), Ok(CannedAcl::Private));
        assert!("world-writable".parse::<CannedAcl>().is_err());
    }

    #[test]
    fn test_storage_class_names() {
        assert_eq!(StorageClass::from("STANDARD_IA"), StorageClass::StandardIa);
        assert_eq!(StorageClass::StandardIa.as_str(), "STANDARD_IA");
        assert_eq!(
            StorageClass::from("EXPRESS_ONEZONE"),
            StorageClass::Custom("EXPRESS_ONEZONE".to_string())
        );
    }

    #[test]
    fn test_put_options_builder() {
        let options = PutObjectOptions::default()
            .with_encryption(ServerSideEncryption::Aes256)
            .with_storage_class(StorageClass::StandardIa);

        assert_eq!(options.acl, None);
        assert_eq!(
            options.server_side_encryption,
            Some(ServerSideEncryption::Aes256)
        );
        assert_eq!(options.storage_class, Some(StorageClass::StandardIa));
    }
}
