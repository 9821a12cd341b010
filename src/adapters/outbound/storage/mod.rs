// Infrastructure error types
pub mod error;

// Provider implementations
pub mod memory;
pub mod s3;

// Re-export key types
pub use error::{ErrorTarget, StoreError};
pub use memory::InMemoryStorageAdapter;
pub use s3::{create_s3_client, S3Config, S3StorageAdapter};
