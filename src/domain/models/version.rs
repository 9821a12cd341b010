use chrono::{DateTime, Utc};

use crate::domain::value_objects::{BucketName, ObjectKey, VersionId};

/// Most identifiers the provider accepts in one batch delete
pub const MAX_DELETE_BATCH: usize = 1000;

/// Versioning state of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersioningStatus {
    /// Versioning has never been enabled
    #[default]
    Unversioned,
    Enabled,
    Suspended,
}

impl VersioningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersioningStatus::Unversioned => "Unversioned",
            VersioningStatus::Enabled => "Enabled",
            VersioningStatus::Suspended => "Suspended",
        }
    }
}

impl std::fmt::Display for VersioningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a version listing: an object revision or a delete marker
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectVersionDescriptor {
    pub key: ObjectKey,
    pub version_id: VersionId,
    pub is_latest: bool,
    pub is_delete_marker: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectVersionDescriptor {
    /// Identifier addressing exactly this version in a delete request
    pub fn identifier(&self) -> ObjectIdentifier {
        ObjectIdentifier::versioned(self.key.clone(), self.version_id.clone())
    }
}

/// One entry of a batch delete request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
}

impl ObjectIdentifier {
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            version_id: None,
        }
    }

    pub fn versioned(key: ObjectKey, version_id: VersionId) -> Self {
        Self {
            key,
            version_id: Some(version_id),
        }
    }
}

/// Result of a single-object delete
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteObjectOutcome {
    /// True when the delete created (or removed) a delete marker
    pub delete_marker: bool,
    pub version_id: Option<VersionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedObject {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
    pub delete_marker: bool,
}

/// Per-item failure inside a batch delete
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFailure {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
    pub code: String,
    pub message: String,
}

/// Result of a batch delete; items succeed or fail independently
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteObjectsOutcome {
    pub deleted: Vec<DeletedObject>,
    pub errors: Vec<DeleteFailure>,
}

/// What a bucket purge observed and removed
#[derive(Debug, Clone, PartialEq)]
pub struct PurgeReport {
    pub bucket: BucketName,
    /// Versions and delete markers found by the listing
    pub listed: usize,
    /// Batch delete requests issued
    pub batches: usize,
    pub deleted: Vec<DeletedObject>,
    pub failures: Vec<DeleteFailure>,
}

impl PurgeReport {
    pub fn empty(bucket: BucketName) -> Self {
        Self {
            bucket,
            listed: 0,
            batches: 0,
            deleted: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
