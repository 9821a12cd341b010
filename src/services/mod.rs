mod cleanup_service_impl;
pub mod resource_namer;
pub mod temp_files;
pub mod walkthrough;

pub use cleanup_service_impl::CleanupServiceImpl;
pub use temp_files::{TempFile, TempFiles};
pub use walkthrough::{
    FailurePolicy, Step, StepError, StepOutcome, StepRecord, Walkthrough, WalkthroughConfig,
    WalkthroughReport,
};
