pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export key types for convenience

// Domain types - value objects, models and errors
pub use domain::{
    AccessControlList, BucketName, CannedAcl, DomainValidationError, ObjectKey,
    ObjectVersionDescriptor, PurgeReport, ServerSideEncryption, StorageClass, StorageError,
    StorageResult, VersionId, VersioningStatus,
};

// Port types - interfaces for external systems
pub use ports::{CleanupService, StorageProvider};

// Service implementations
pub use services::{
    CleanupServiceImpl, FailurePolicy, Step, StepError, StepOutcome, Walkthrough,
    WalkthroughConfig, WalkthroughReport,
};

// Application factory and configuration
pub use app::{
    create_app_from_env, create_in_memory_app, create_s3_app, AppBuilder, AppConfig, AppError,
    AppServices, StorageBackend,
};

// Adapter types - infrastructure implementations
pub use adapters::outbound::storage::{InMemoryStorageAdapter, S3Config, S3StorageAdapter};

// Public facade for easy construction
pub mod prelude {
    pub use crate::{
        create_in_memory_app, create_s3_app, AppBuilder, AppServices, BucketName, CleanupService,
        FailurePolicy, InMemoryStorageAdapter, ObjectKey, S3Config, S3StorageAdapter,
        StorageProvider, VersionId, Walkthrough, WalkthroughConfig,
    };
}
