use crate::entities::stored_files;
use crate::services::error::UploadError;
use crate::services::remote::{RemoteObject, RemoteStorage, RemoteStorageError};
use crate::services::staging::StagedFile;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

/// Prefix of the relative paths handed out for local files
pub const LOCAL_PUBLIC_PREFIX: &str = "uploads";

/// Final location of an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredFile {
    Local {
        /// `uploads/<staged name>`
        path: String,
    },
    Remote {
        provider: String,
        id: String,
        url: String,
    },
}

impl StoredFile {
    pub fn kind(&self) -> &'static str {
        match self {
            StoredFile::Local { .. } => stored_files::KIND_LOCAL,
            StoredFile::Remote { .. } => stored_files::KIND_REMOTE,
        }
    }

    /// Value published as the summary's `file_path`: the relative local path
    /// or the remote URL.
    pub fn file_path(&self) -> &str {
        match self {
            StoredFile::Local { path } => path,
            StoredFile::Remote { url, .. } => url,
        }
    }

    pub fn from_model(model: &stored_files::Model) -> Option<Self> {
        match model.kind.as_str() {
            stored_files::KIND_LOCAL => Some(StoredFile::Local {
                path: model.local_path.clone()?,
            }),
            stored_files::KIND_REMOTE => Some(StoredFile::Remote {
                provider: model.provider.clone()?,
                id: model.remote_id.clone()?,
                url: model.remote_url.clone()?,
            }),
            _ => None,
        }
    }
}

/// Storage configuration fixed at startup. There is no remote-only mode:
/// remote placement always has the local directory behind it.
#[derive(Clone)]
pub enum StorageBackend {
    LocalOnly,
    RemoteWithFallback(Arc<dyn RemoteStorage>),
}

impl StorageBackend {
    pub fn describe(&self) -> String {
        match self {
            StorageBackend::LocalOnly => "local".to_string(),
            StorageBackend::RemoteWithFallback(remote) => {
                format!("{} (local fallback)", remote.provider_id())
            }
        }
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteStorage>> {
        match self {
            StorageBackend::LocalOnly => None,
            StorageBackend::RemoteWithFallback(remote) => Some(remote),
        }
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Public uploads directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn place(&self, staged: StagedFile) -> Result<StoredFile, UploadError> {
        let name = staged.name().to_string();
        let dest = self.root.join(&name);
        staged.relocate(&dest).await?;

        Ok(StoredFile::Local {
            path: format!("{}/{}", LOCAL_PUBLIC_PREFIX, name),
        })
    }

    /// Maps a published relative path back to the file inside the uploads
    /// directory. Anything that is not a single plain file name under the
    /// prefix is rejected.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let name = relative
            .strip_prefix(LOCAL_PUBLIC_PREFIX)?
            .strip_prefix('/')?;

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }

    pub async fn remove(&self, relative: &str) -> io::Result<()> {
        let path = self.resolve(relative).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not an uploads path: {}", relative),
            )
        })?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Decides where a staged upload ends up. Remote failures and timeouts fall
/// back to local placement and are never reported to the client.
pub struct PlacementResolver {
    local: LocalStore,
    backend: StorageBackend,
    remote_timeout: Duration,
}

impl PlacementResolver {
    pub fn new(local: LocalStore, backend: StorageBackend, remote_timeout: Duration) -> Self {
        Self {
            local,
            backend,
            remote_timeout,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub async fn resolve(&self, staged: StagedFile) -> Result<StoredFile, UploadError> {
        let remote = match &self.backend {
            StorageBackend::LocalOnly => return self.local.place(staged).await,
            StorageBackend::RemoteWithFallback(remote) => remote,
        };

        match self.push_remote(remote.as_ref(), &staged).await {
            Ok(object) => {
                info!(
                    "☁️  Stored {} on {} as {}",
                    staged.name(),
                    remote.provider_id(),
                    object.id
                );
                if let Err(e) = staged.discard().await {
                    warn!("Failed to discard staged copy after remote upload: {}", e);
                }
                Ok(StoredFile::Remote {
                    provider: remote.provider_id().to_string(),
                    id: object.id,
                    url: object.url,
                })
            }
            Err(e) => {
                warn!(
                    "⚠️  Remote upload to {} failed, falling back to local storage: {}",
                    remote.provider_id(),
                    e
                );
                self.local.place(staged).await
            }
        }
    }

    async fn push_remote(
        &self,
        remote: &dyn RemoteStorage,
        staged: &StagedFile,
    ) -> Result<RemoteObject, RemoteStorageError> {
        let upload = remote.upload(staged.path(), staged.name(), staged.mime_type());
        match tokio::time::timeout(self.remote_timeout, upload).await {
            Ok(result) => result,
            Err(_) => Err(RemoteStorageError::Timeout(self.remote_timeout)),
        }
    }

    /// Deletes the bytes behind a stored file.
    pub async fn release(&self, stored: &StoredFile) -> anyhow::Result<()> {
        match stored {
            StoredFile::Local { path } => {
                self.local.remove(path).await?;
            }
            StoredFile::Remote { provider, id, .. } => match self.backend.remote() {
                Some(remote) if remote.provider_id() == provider => {
                    tokio::time::timeout(self.remote_timeout, remote.delete(id))
                        .await
                        .map_err(|_| RemoteStorageError::Timeout(self.remote_timeout))??;
                }
                _ => {
                    warn!(
                        "No {} client configured, leaving remote object {} in place",
                        provider, id
                    );
                }
            },
        }
        Ok(())
    }
}
