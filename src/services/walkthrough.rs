//! The bucket walkthrough: a fixed sequence of provider calls covering bucket
//! creation, upload and download, copy, ACLs, encryption, storage classes,
//! versioning, listing and cleanup.
//!
//! Every step returns its own `Result`. What happens after a failed step is
//! decided by the [`FailurePolicy`] the caller configures.

use bytes::Bytes;
use futures::TryStreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    domain::{
        errors::{StorageError, ValidationError},
        models::{CannedAcl, PutObjectOptions, PutObjectOutcome, ServerSideEncryption, StorageClass},
        value_objects::{BucketName, ObjectKey},
    },
    ports::{services::CleanupService, storage::StorageProvider},
    services::temp_files::{TempFile, TempFiles},
};

/// What to do after a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and run the remaining steps
    #[default]
    ContinueOnError,
    /// Stop at the first failure; temp files are still removed
    AbortOnError,
}

#[derive(Debug, Clone)]
pub struct WalkthroughConfig {
    pub first_bucket_prefix: String,
    pub second_bucket_prefix: String,
    /// Region for new buckets; the provider's region when unset
    pub region: Option<String>,
    /// Where temp files are written
    pub work_dir: PathBuf,
    /// Where downloaded objects are written
    pub download_dir: PathBuf,
    pub failure_policy: FailurePolicy,
    /// Re-upload into the unversioned bucket before purging it, to observe
    /// `null` versions
    pub probe_null_versions: bool,
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        Self {
            first_bucket_prefix: "first-bucket-".to_string(),
            second_bucket_prefix: "second-bucket-".to_string(),
            region: None,
            work_dir: PathBuf::from("."),
            download_dir: std::env::temp_dir(),
            failure_policy: FailurePolicy::default(),
            probe_null_versions: false,
        }
    }
}

/// Steps in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CreateFirstBucket,
    CreateSecondBucket,
    CreateFirstFile,
    UploadFirstFile,
    DownloadFirstFile,
    CopyToSecondBucket,
    DeleteCopiedObject,
    CreateSecondFile,
    UploadPublicFile,
    InspectPublicAcl,
    MakeFilePrivate,
    CreateThirdFile,
    UploadEncryptedFile,
    ChangeStorageClass,
    EnableVersioning,
    ReuploadSecondFile,
    ListBuckets,
    ListObjects,
    PurgeFirstBucket,
    ProbeNullVersion,
    PurgeSecondBucket,
    DeleteFirstBucket,
    DeleteSecondBucket,
    RemoveTempFiles,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreateFirstBucket => "create_first_bucket",
            Step::CreateSecondBucket => "create_second_bucket",
            Step::CreateFirstFile => "create_first_file",
            Step::UploadFirstFile => "upload_first_file",
            Step::DownloadFirstFile => "download_first_file",
            Step::CopyToSecondBucket => "copy_to_second_bucket",
            Step::DeleteCopiedObject => "delete_copied_object",
            Step::CreateSecondFile => "create_second_file",
            Step::UploadPublicFile => "upload_public_file",
            Step::InspectPublicAcl => "inspect_public_acl",
            Step::MakeFilePrivate => "make_file_private",
            Step::CreateThirdFile => "create_third_file",
            Step::UploadEncryptedFile => "upload_encrypted_file",
            Step::ChangeStorageClass => "change_storage_class",
            Step::EnableVersioning => "enable_versioning",
            Step::ReuploadSecondFile => "reupload_second_file",
            Step::ListBuckets => "list_buckets",
            Step::ListObjects => "list_objects",
            Step::PurgeFirstBucket => "purge_first_bucket",
            Step::ProbeNullVersion => "probe_null_version",
            Step::PurgeSecondBucket => "purge_second_bucket",
            Step::DeleteFirstBucket => "delete_first_bucket",
            Step::DeleteSecondBucket => "delete_second_bucket",
            Step::RemoveTempFiles => "remove_temp_files",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a step failed
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{failed} of {listed} versions in {bucket} could not be deleted")]
    IncompletePurge {
        bucket: BucketName,
        listed: usize,
        failed: usize,
    },

    /// An earlier step that produces this state failed or did not run
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(&'static str),
}

impl StepError {
    pub fn category(&self) -> &'static str {
        match self {
            StepError::Storage(err) => err.category(),
            StepError::Validation(_) => "ValidationError",
            StepError::Io(_) => "IoError",
            StepError::IncompletePurge { .. } => "IncompletePurge",
            StepError::MissingPrerequisite(_) => "MissingPrerequisite",
        }
    }
}

type StepResult = Result<String, StepError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded { detail: String },
    Failed { category: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkthroughReport {
    pub first_bucket: Option<String>,
    pub second_bucket: Option<String>,
    pub steps: Vec<StepRecord>,
    /// Set when `AbortOnError` stopped the run
    pub aborted_at: Option<Step>,
}

impl WalkthroughReport {
    pub fn succeeded(&self) -> bool {
        self.aborted_at.is_none() && self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|record| matches!(record.outcome, StepOutcome::Failed { .. }))
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }
}

/// State handed from one step to the next
#[derive(Debug, Default)]
struct RunState {
    first_bucket: Option<BucketName>,
    second_bucket: Option<BucketName>,
    first_file: Option<TempFile>,
    second_file: Option<TempFile>,
    third_file: Option<TempFile>,
}

fn require<'a, T>(value: &'a Option<T>, what: &'static str) -> Result<&'a T, StepError> {
    value.as_ref().ok_or(StepError::MissingPrerequisite(what))
}

/// Runs the walkthrough against one explicitly supplied provider
pub struct Walkthrough {
    provider: Arc<dyn StorageProvider>,
    cleanup: Arc<dyn CleanupService>,
    config: WalkthroughConfig,
}

impl Walkthrough {
    pub fn new(
        provider: Arc<dyn StorageProvider>,
        cleanup: Arc<dyn CleanupService>,
        config: WalkthroughConfig,
    ) -> Self {
        Self {
            provider,
            cleanup,
            config,
        }
    }

    pub async fn run(&self) -> WalkthroughReport {
        let mut state = RunState::default();
        let mut files = TempFiles::new(&self.config.work_dir);
        let mut report = WalkthroughReport::default();

        if let Err(step) = self.run_steps(&mut state, &mut files, &mut report).await {
            warn!(%step, "aborting walkthrough");
            report.aborted_at = Some(step);
        }

        let removal = files
            .remove_all()
            .await
            .map(|removed| format!("removed {} local file(s)", removed))
            .map_err(StepError::from);
        Self::push_record(&mut report, Step::RemoveTempFiles, removal);

        report.first_bucket = state.first_bucket.map(|b| b.to_string());
        report.second_bucket = state.second_bucket.map(|b| b.to_string());
        report
    }

    async fn run_steps(
        &self,
        state: &mut RunState,
        files: &mut TempFiles,
        report: &mut WalkthroughReport,
    ) -> Result<(), Step> {
        let result = self.create_first_bucket(state).await;
        self.record(report, Step::CreateFirstBucket, result)?;

        let result = self.create_second_bucket(state).await;
        self.record(report, Step::CreateSecondBucket, result)?;

        let result = self.create_first_file(state, files).await;
        self.record(report, Step::CreateFirstFile, result)?;

        let result = self.upload_first_file(state).await;
        self.record(report, Step::UploadFirstFile, result)?;

        let result = self.download_first_file(state, files).await;
        self.record(report, Step::DownloadFirstFile, result)?;

        let result = self.copy_to_second_bucket(state).await;
        self.record(report, Step::CopyToSecondBucket, result)?;

        let result = self.delete_copied_object(state).await;
        self.record(report, Step::DeleteCopiedObject, result)?;

        let result = self.create_second_file(state, files).await;
        self.record(report, Step::CreateSecondFile, result)?;

        let result = self.upload_public_file(state).await;
        self.record(report, Step::UploadPublicFile, result)?;

        let result = self.inspect_public_acl(state).await;
        self.record(report, Step::InspectPublicAcl, result)?;

        let result = self.make_file_private(state).await;
        self.record(report, Step::MakeFilePrivate, result)?;

        let result = self.create_third_file(state, files).await;
        self.record(report, Step::CreateThirdFile, result)?;

        let result = self.upload_encrypted_file(state).await;
        self.record(report, Step::UploadEncryptedFile, result)?;

        let result = self.change_storage_class(state).await;
        self.record(report, Step::ChangeStorageClass, result)?;

        let result = self.enable_versioning(state).await;
        self.record(report, Step::EnableVersioning, result)?;

        let result = self.reupload_second_file(state).await;
        self.record(report, Step::ReuploadSecondFile, result)?;

        let result = self.list_buckets().await;
        self.record(report, Step::ListBuckets, result)?;

        let result = self.list_objects(state).await;
        self.record(report, Step::ListObjects, result)?;

        let result = self.purge(&state.first_bucket, "first bucket").await;
        self.record(report, Step::PurgeFirstBucket, result)?;

        if self.config.probe_null_versions {
            let result = self.probe_null_version(state).await;
            self.record(report, Step::ProbeNullVersion, result)?;
        }

        let result = self.purge(&state.second_bucket, "second bucket").await;
        self.record(report, Step::PurgeSecondBucket, result)?;

        let result = self.delete_bucket(&state.first_bucket, "first bucket").await;
        self.record(report, Step::DeleteFirstBucket, result)?;

        let result = self
            .delete_bucket(&state.second_bucket, "second bucket")
            .await;
        self.record(report, Step::DeleteSecondBucket, result)?;

        Ok(())
    }

    /// Log and store a step result; `Err(step)` means the run must stop
    /// Record the step, then apply the failure policy
    fn record(
        &self,
        report: &mut WalkthroughReport,
        step: Step,
        result: StepResult,
    ) -> Result<(), Step> {
        let failed = Self::push_record(report, step, result);
        match (failed, self.config.failure_policy) {
            (true, FailurePolicy::AbortOnError) => Err(step),
            _ => Ok(()),
        }
    }

    /// Append the outcome to the report, returning whether the step failed
    fn push_record(report: &mut WalkthroughReport, step: Step, result: StepResult) -> bool {
        match result {
            Ok(detail) => {
                info!(%step, "{}", detail);
                report.steps.push(StepRecord {
                    step,
                    outcome: StepOutcome::Succeeded { detail },
                });
                false
            }
            Err(err) => {
                warn!(%step, category = err.category(), "step failed: {}", err);
                report.steps.push(StepRecord {
                    step,
                    outcome: StepOutcome::Failed {
                        category: err.category().to_string(),
                        message: err.to_string(),
                    },
                });
                true
            }
        }
    }

    fn bucket_region(&self) -> &str {
        self.config
            .region
            .as_deref()
            .unwrap_or_else(|| self.provider.region())
    }

    async fn create_bucket(&self, prefix: &str) -> Result<BucketName, StepError> {
        let bucket = BucketName::generate(prefix)?;
        self.provider
            .create_bucket(&bucket, Some(self.bucket_region()))
            .await?;
        Ok(bucket)
    }

    async fn create_first_bucket(&self, state: &mut RunState) -> StepResult {
        let bucket = self.create_bucket(&self.config.first_bucket_prefix).await?;
        let detail = format!("created {} in {}", bucket, self.bucket_region());
        state.first_bucket = Some(bucket);
        Ok(detail)
    }

    async fn create_second_bucket(&self, state: &mut RunState) -> StepResult {
        let bucket = self.create_bucket(&self.config.second_bucket_prefix).await?;
        let detail = format!("created {} in {}", bucket, self.bucket_region());
        state.second_bucket = Some(bucket);
        Ok(detail)
    }

    async fn create_file(
        files: &mut TempFiles,
        slot: &mut Option<TempFile>,
        size: usize,
        file_name: &str,
        content: &str,
    ) -> StepResult {
        let file = files.create(size, file_name, content).await?;
        let detail = format!("wrote {}", file.path.display());
        *slot = Some(file);
        Ok(detail)
    }

    async fn create_first_file(&self, state: &mut RunState, files: &mut TempFiles) -> StepResult {
        Self::create_file(files, &mut state.first_file, 300, "firstfile.txt", "f").await
    }

    async fn create_second_file(&self, state: &mut RunState, files: &mut TempFiles) -> StepResult {
        Self::create_file(files, &mut state.second_file, 400, "secondfile.txt", "s").await
    }

    async fn create_third_file(&self, state: &mut RunState, files: &mut TempFiles) -> StepResult {
        Self::create_file(files, &mut state.third_file, 300, "thirdfile.txt", "t").await
    }

    /// Upload a local file under its generated name
    async fn upload(
        &self,
        bucket: &BucketName,
        file: &TempFile,
        options: &PutObjectOptions,
    ) -> Result<(ObjectKey, PutObjectOutcome), StepError> {
        let data = tokio::fs::read(&file.path).await?;
        let key = ObjectKey::new(file.name.clone())?;
        let outcome = self
            .provider
            .put_object(bucket, &key, Bytes::from(data), options)
            .await?;
        Ok((key, outcome))
    }

    async fn upload_first_file(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.first_file, "first file")?;
        let (key, _) = self
            .upload(bucket, file, &PutObjectOptions::default())
            .await?;
        Ok(format!("uploaded {}/{}", bucket, key))
    }

    async fn download_first_file(&self, state: &RunState, files: &mut TempFiles) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.first_file, "first file")?;
        let key = ObjectKey::new(file.name.clone())?;

        let data = self.provider.get_object(bucket, &key, None).await?;
        let target = self.config.download_dir.join(&file.name);
        tokio::fs::write(&target, &data).await?;
        files.track(target.clone());

        Ok(format!(
            "downloaded {} bytes to {}",
            data.len(),
            target.display()
        ))
    }

    async fn copy_to_second_bucket(&self, state: &RunState) -> StepResult {
        let source = require(&state.first_bucket, "first bucket")?;
        let destination = require(&state.second_bucket, "second bucket")?;
        let file = require(&state.first_file, "first file")?;
        let key = ObjectKey::new(file.name.clone())?;

        self.provider
            .copy_object(source, &key, destination, &key)
            .await?;
        Ok(format!("copied {} from {} to {}", key, source, destination))
    }

    async fn delete_copied_object(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.second_bucket, "second bucket")?;
        let file = require(&state.first_file, "first file")?;
        let key = ObjectKey::new(file.name.clone())?;

        self.provider.delete_object(bucket, &key, None).await?;
        Ok(format!("deleted {}/{}", bucket, key))
    }

    async fn upload_public_file(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.second_file, "second file")?;
        let options = PutObjectOptions::default().with_acl(CannedAcl::PublicRead);

        let (key, _) = self.upload(bucket, file, &options).await?;
        Ok(format!("uploaded {}/{} as public-read", bucket, key))
    }

    async fn grants(&self, bucket: &BucketName, key: &ObjectKey) -> Result<String, StepError> {
        let acl = self.provider.get_object_acl(bucket, key).await?;
        let grants: Vec<String> = acl.grants.iter().map(ToString::to_string).collect();
        Ok(format!("[{}]", grants.join(", ")))
    }

    async fn inspect_public_acl(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.second_file, "second file")?;
        let key = ObjectKey::new(file.name.clone())?;

        Ok(format!("grants: {}", self.grants(bucket, &key).await?))
    }

    async fn make_file_private(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.second_file, "second file")?;
        let key = ObjectKey::new(file.name.clone())?;

        self.provider
            .put_object_acl(bucket, &key, CannedAcl::Private)
            .await?;
        Ok(format!("grants: {}", self.grants(bucket, &key).await?))
    }

    async fn upload_encrypted_file(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.third_file, "third file")?;
        let options = PutObjectOptions::default().with_encryption(ServerSideEncryption::Aes256);

        let (key, _) = self.upload(bucket, file, &options).await?;
        let head = self.provider.head_object(bucket, &key).await?;
        Ok(format!(
            "server-side encryption: {}",
            head.server_side_encryption
                .map_or("none", |sse| sse.as_str())
        ))
    }

    async fn change_storage_class(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let file = require(&state.third_file, "third file")?;
        let options = PutObjectOptions::default()
            .with_encryption(ServerSideEncryption::Aes256)
            .with_storage_class(StorageClass::StandardIa);

        let (key, _) = self.upload(bucket, file, &options).await?;
        let head = self.provider.head_object(bucket, &key).await?;
        Ok(format!("storage class: {}", head.storage_class))
    }

    async fn enable_versioning(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;

        self.provider.put_bucket_versioning(bucket, true).await?;
        let status = self.provider.get_bucket_versioning(bucket).await?;
        Ok(format!("versioning on {}: {}", bucket, status))
    }

    async fn reupload_second_file(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let second = require(&state.second_file, "second file")?;
        let first = require(&state.first_file, "first file")?;

        let (key, outcome) = self
            .upload(bucket, second, &PutObjectOptions::default())
            .await?;
        let first_key = ObjectKey::new(first.name.clone())?;
        let head = self.provider.head_object(bucket, &first_key).await?;

        Ok(format!(
            "{} now at version {}; {} at version {}",
            key,
            outcome
                .version_id
                .map_or_else(|| "none".to_string(), |v| v.to_string()),
            first_key,
            head.version_id
                .map_or_else(|| "none".to_string(), |v| v.to_string()),
        ))
    }

    async fn list_buckets(&self) -> StepResult {
        let buckets = self.provider.list_buckets().await?;
        let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
        Ok(format!("{} bucket(s): {}", names.len(), names.join(", ")))
    }

    async fn list_objects(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.first_bucket, "first bucket")?;
        let objects = self.provider.list_objects(bucket, None).await?;

        let mut lines = Vec::with_capacity(objects.len());
        for object in &objects {
            let head = self.provider.head_object(bucket, &object.key).await?;
            lines.push(format!(
                "{} {} {} {} {:?}",
                object.key,
                object.storage_class,
                object
                    .last_modified
                    .map_or_else(|| "-".to_string(), |t| t.to_rfc3339()),
                head.version_id
                    .map_or_else(|| "-".to_string(), |v| v.to_string()),
                head.metadata,
            ));
        }

        Ok(format!(
            "{} object(s) in {}: {}",
            objects.len(),
            bucket,
            lines.join("; ")
        ))
    }

    async fn purge(&self, bucket: &Option<BucketName>, what: &'static str) -> StepResult {
        let bucket = require(bucket, what)?;
        let report = self.cleanup.purge_bucket(bucket).await?;

        if !report.is_complete() {
            return Err(StepError::IncompletePurge {
                bucket: bucket.clone(),
                listed: report.listed,
                failed: report.failures.len(),
            });
        }

        Ok(format!(
            "deleted {} version(s) from {} in {} batch request(s)",
            report.deleted.len(),
            bucket,
            report.batches
        ))
    }

    async fn probe_null_version(&self, state: &RunState) -> StepResult {
        let bucket = require(&state.second_bucket, "second bucket")?;
        let file = require(&state.first_file, "first file")?;

        let (key, _) = self
            .upload(bucket, file, &PutObjectOptions::default())
            .await?;
        let descriptors: Vec<String> = self
            .provider
            .list_object_versions(bucket)
            .map_ok(|v| format!("{}@{}", v.key, v.version_id))
            .try_collect()
            .await?;
        Ok(format!(
            "uploaded {} to unversioned {}; versions: [{}]",
            key,
            bucket,
            descriptors.join(", ")
        ))
    }

    async fn delete_bucket(&self, bucket: &Option<BucketName>, what: &'static str) -> StepResult {
        let bucket = require(bucket, what)?;
        self.provider.delete_bucket(bucket).await?;
        Ok(format!("deleted {}", bucket))
    }
}
