pub mod error;
pub mod placement;
pub mod rate_limit;
pub mod recorder;
pub mod remote;
pub mod staging;
pub mod staging_sweeper;
pub mod summary_service;
pub mod upload_service;
