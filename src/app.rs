use std::sync::Arc;
use tracing::info;

use crate::{
    adapters::outbound::storage::{
        create_s3_client, InMemoryStorageAdapter, S3Config, S3StorageAdapter,
    },
    ports::{services::CleanupService, storage::StorageProvider},
    services::{CleanupServiceImpl, Walkthrough, WalkthroughConfig},
};

/// Configuration for the application
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
}

/// Storage backend configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StorageBackend {
    #[default]
    InMemory,
    S3(S3Config),
}

impl StorageBackend {
    /// Read the backend from environment-style settings.
    ///
    /// `STORAGE_BACKEND` selects `memory` (the default) or `s3`; the S3
    /// backend reads `AWS_REGION`, `S3_ENDPOINT`, `S3_ACCESS_KEY`,
    /// `S3_SECRET_KEY` and `S3_FORCE_PATH_STYLE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("memory") => Ok(StorageBackend::InMemory),
            Some("s3") => {
                let defaults = S3Config::default();
                Ok(StorageBackend::S3(S3Config {
                    region: lookup("AWS_REGION").unwrap_or(defaults.region),
                    endpoint: lookup("S3_ENDPOINT"),
                    access_key: lookup("S3_ACCESS_KEY"),
                    secret_key: lookup("S3_SECRET_KEY"),
                    force_path_style: lookup("S3_FORCE_PATH_STYLE")
                        .map(|v| v.eq_ignore_ascii_case("true"))
                        .unwrap_or(false),
                }))
            }
            Some(other) => Err(AppError::Configuration {
                message: format!("unknown STORAGE_BACKEND '{}', expected memory or s3", other),
            }),
        }
    }
}

/// Application services container
#[derive(Clone)]
pub struct AppServices {
    pub provider: Arc<dyn StorageProvider>,
    pub cleanup_service: Arc<dyn CleanupService>,
}

impl AppServices {
    /// A walkthrough driving this application's provider
    pub fn walkthrough(&self, config: WalkthroughConfig) -> Walkthrough {
        Walkthrough::new(self.provider.clone(), self.cleanup_service.clone(), config)
    }
}

/// Application builder for dependency injection
pub struct AppBuilder {
    config: AppConfig,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage_backend = backend;
        self
    }

    /// Create the storage provider for the configured backend
    pub async fn build_provider(&self) -> Result<Arc<dyn StorageProvider>, AppError> {
        match &self.config.storage_backend {
            StorageBackend::InMemory => {
                info!("using in-memory storage provider");
                Ok(Arc::new(InMemoryStorageAdapter::new()))
            }
            StorageBackend::S3(s3) => {
                if s3.access_key.is_some() != s3.secret_key.is_some() {
                    return Err(AppError::Configuration {
                        message: "S3_ACCESS_KEY and S3_SECRET_KEY must be set together"
                            .to_string(),
                    });
                }
                info!(
                    region = %s3.region,
                    endpoint = s3.endpoint.as_deref().unwrap_or("aws"),
                    "using S3 storage provider"
                );
                let client = create_s3_client(s3).await;
                Ok(Arc::new(S3StorageAdapter::new(client, s3.region.clone())))
            }
        }
    }

    /// Build the complete application with services
    pub async fn build(self) -> Result<AppServices, AppError> {
        let provider = self.build_provider().await?;
        let cleanup_service = Arc::new(CleanupServiceImpl::new(provider.clone()));

        Ok(AppServices {
            provider,
            cleanup_service,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Create an in-memory application for testing and development
pub async fn create_in_memory_app() -> Result<AppServices, AppError> {
    AppBuilder::new()
        .with_storage_backend(StorageBackend::InMemory)
        .build()
        .await
}

/// Create an S3-backed application
pub async fn create_s3_app(config: S3Config) -> Result<AppServices, AppError> {
    AppBuilder::new()
        .with_storage_backend(StorageBackend::S3(config))
        .build()
        .await
}

/// Create application from environment variables
pub async fn create_app_from_env() -> Result<AppServices, AppError> {
    let storage_backend = StorageBackend::from_lookup(|name| std::env::var(name).ok())?;

    AppBuilder::new()
        .with_storage_backend(storage_backend)
        .build()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[tokio::test]
    async fn test_create_in_memory_app() {
        let app = create_in_memory_app().await.unwrap();
        assert_eq!(app.provider.region(), "us-east-1");
        assert!(app.provider.list_buckets().await.unwrap().is_empty());
    }

    #[test]
    fn test_backend_defaults_to_memory() {
        let backend = StorageBackend::from_lookup(lookup(&[])).unwrap();
        assert_eq!(backend, StorageBackend::InMemory);
    }

    #[test]
    fn test_s3_backend_from_lookup() {
        let backend = StorageBackend::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "s3"),
            ("AWS_REGION", "eu-west-1"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_FORCE_PATH_STYLE", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(
            backend,
            StorageBackend::S3(S3Config {
                region: "eu-west-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
                access_key: None,
                secret_key: None,
                force_path_style: true,
            })
        );
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = StorageBackend::from_lookup(lookup(&[("STORAGE_BACKEND", "ftp")])).unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[tokio::test]
    async fn test_half_configured_credentials_are_rejected() {
        let result = AppBuilder::new()
            .with_storage_backend(StorageBackend::S3(S3Config {
                access_key: Some("key".to_string()),
                ..S3Config::default()
            }))
            .build()
            .await;
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }
}
