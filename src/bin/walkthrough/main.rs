use anyhow::{Context, Result};
use bucket_walkthrough::{
    app::{AppBuilder, AppConfig, StorageBackend},
    services::{FailurePolicy, StepOutcome, WalkthroughConfig, WalkthroughReport},
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bucket-walkthrough")]
#[command(
    about = "Walk through bucket and object operations against an object storage provider",
    long_about = None
)]
struct Cli {
    /// Storage backend type (memory or s3)
    #[arg(long, env = "STORAGE_BACKEND", default_value = "memory")]
    storage_backend: String,

    /// Region of the client and of the created buckets
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// S3 endpoint URL, for S3-compatible services
    #[arg(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// S3 access key
    #[arg(long, env = "S3_ACCESS_KEY")]
    s3_access_key: Option<String>,

    /// S3 secret key
    #[arg(long, env = "S3_SECRET_KEY")]
    s3_secret_key: Option<String>,

    /// Use path-style bucket addressing (also read from S3_FORCE_PATH_STYLE)
    #[arg(long)]
    s3_force_path_style: bool,

    /// Name prefix of the first bucket
    #[arg(long, env = "WALKTHROUGH_FIRST_PREFIX", default_value = "first-bucket-")]
    first_prefix: String,

    /// Name prefix of the second bucket
    #[arg(long, env = "WALKTHROUGH_SECOND_PREFIX", default_value = "second-bucket-")]
    second_prefix: String,

    /// Directory the temp files are written to
    #[arg(long, env = "WALKTHROUGH_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Directory downloads are written to (system temp dir by default)
    #[arg(long, env = "WALKTHROUGH_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Stop at the first failed step
    #[arg(long)]
    abort_on_error: bool,

    /// Upload into the unversioned bucket before purging it to observe null versions
    #[arg(long)]
    probe_null_versions: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Settings given on the command line, falling back to the environment
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "STORAGE_BACKEND" => Some(self.storage_backend.clone()),
            "AWS_REGION" => Some(self.region.clone()),
            "S3_ENDPOINT" => self.s3_endpoint.clone(),
            "S3_ACCESS_KEY" => self.s3_access_key.clone(),
            "S3_SECRET_KEY" => self.s3_secret_key.clone(),
            "S3_FORCE_PATH_STYLE" if self.s3_force_path_style => Some("true".to_string()),
            _ => std::env::var(name).ok(),
        }
    }

    fn to_app_config(&self) -> Result<AppConfig> {
        let storage_backend = StorageBackend::from_lookup(|name| self.lookup(name))?;
        Ok(AppConfig { storage_backend })
    }

    fn to_walkthrough_config(&self) -> WalkthroughConfig {
        let defaults = WalkthroughConfig::default();
        WalkthroughConfig {
            first_bucket_prefix: self.first_prefix.clone(),
            second_bucket_prefix: self.second_prefix.clone(),
            region: Some(self.region.clone()),
            work_dir: self.work_dir.clone(),
            download_dir: self.download_dir.clone().unwrap_or(defaults.download_dir),
            failure_policy: if self.abort_on_error {
                FailurePolicy::AbortOnError
            } else {
                FailurePolicy::ContinueOnError
            },
            probe_null_versions: self.probe_null_versions,
        }
    }

    fn init_logging(&self) {
        let env_filter =
            EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

        // stdout carries the report
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_report(report: &WalkthroughReport) {
    for record in &report.steps {
        match &record.outcome {
            StepOutcome::Succeeded { detail } => println!("[ok]   {}: {}", record.step, detail),
            StepOutcome::Failed { category, message } => {
                println!("[fail] {}: {} ({})", record.step, message, category)
            }
        }
    }
    if let Some(step) = report.aborted_at {
        println!("aborted after {}", step);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli.init_logging();

    info!("Storage backend: {}", cli.storage_backend);

    let config = cli.to_app_config()?;
    let app = AppBuilder::new()
        .with_config(config)
        .build()
        .await
        .context("Failed to build application")?;

    let report = app.walkthrough(cli.to_walkthrough_config()).run().await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }

    let failed = report.failures().count();
    if failed > 0 || report.aborted_at.is_some() {
        anyhow::bail!("{} step(s) failed", failed);
    }

    info!("walkthrough complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "bucket-walkthrough",
            "--storage-backend",
            "s3",
            "--region",
            "eu-central-1",
            "--s3-endpoint",
            "http://localhost:9000",
            "--s3-force-path-style",
            "--abort-on-error",
        ]);

        let config = cli.to_app_config().unwrap();
        match config.storage_backend {
            StorageBackend::S3(s3) => {
                assert_eq!(s3.region, "eu-central-1");
                assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
                assert!(s3.force_path_style);
            }
            other => panic!("unexpected backend {:?}", other),
        }

        let walkthrough = cli.to_walkthrough_config();
        assert_eq!(walkthrough.failure_policy, FailurePolicy::AbortOnError);
        assert_eq!(walkthrough.region.as_deref(), Some("eu-central-1"));
        assert!(!walkthrough.probe_null_versions);
    }

    #[test]
    fn test_unknown_backend() {
        let cli = Cli::parse_from(["bucket-walkthrough", "--storage-backend", "ftp"]);
        let err = cli.to_app_config().unwrap_err();
        assert!(err.to_string().contains("unknown STORAGE_BACKEND 'ftp'"));
    }

    #[test]
    fn test_credentials_flow_into_s3_config() {
        let cli = Cli::parse_from([
            "bucket-walkthrough",
            "--storage-backend",
            "s3",
            "--s3-access-key",
            "key",
            "--s3-secret-key",
            "secret",
        ]);

        match cli.to_app_config().unwrap().storage_backend {
            StorageBackend::S3(s3) => {
                assert_eq!(s3.access_key.as_deref(), Some("key"));
                assert_eq!(s3.secret_key.as_deref(), Some("secret"));
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }
}
