use chrono::{DateTime, Utc};

use crate::domain::value_objects::BucketName;

/// A bucket as reported by a bucket listing
#[derive(Debug, Clone, PartialEq)]
pub struct BucketInfo {
    pub name: BucketName,
    pub created_at: Option<DateTime<Utc>>,
}
