//! S3 storage adapter built on the AWS SDK.
//!
//! Works against AWS itself and against S3-compatible services such as
//! MinIO, given an endpoint and path-style addressing.

mod s3_adapter;

pub use s3_adapter::S3StorageAdapter;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};

/// Configuration for the S3 backend
#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    pub region: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
        }
    }
}

/// Build an S3 client from configuration.
///
/// Static credentials are used when both keys are set, otherwise the default
/// provider chain (environment, profile, instance role).
pub async fn create_s3_client(config: &S3Config) -> aws_sdk_s3::Client {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key, secret_key, None, None, "static",
        ));
    }

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.force_path_style)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
