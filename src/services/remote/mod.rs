use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub mod google_drive;
pub mod s3;

pub use google_drive::GoogleDriveStorage;
pub use s3::S3RemoteStorage;

/// Stable reference to an object pushed to a remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    /// Durable, fully qualified URL clients are redirected to
    pub url: String,
}

#[derive(Error, Debug)]
pub enum RemoteStorageError {
    #[error("Authentication with remote storage failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote storage returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote storage did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

/// A best-effort remote object store. Implementations may fail transiently;
/// callers are expected to fall back to local storage.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Provider identifier stored next to remote references ("google_drive", "s3")
    fn provider_id(&self) -> &'static str;

    /// Push the file at `path` and return its remote reference
    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<RemoteObject, RemoteStorageError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteStorageError>;

    /// Cheap call proving credentials and connectivity
    async fn verify(&self) -> Result<(), RemoteStorageError>;
}
