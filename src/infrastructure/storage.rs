use crate::config::{AppConfig, RemoteProviderKind};
use crate::services::placement::{LocalStore, PlacementResolver, StorageBackend};
use crate::services::remote::{GoogleDriveStorage, RemoteStorage, S3RemoteStorage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Builds the storage backend from configuration. Misconfigured remotes
/// degrade to local-only storage instead of stopping the server.
pub async fn setup_storage_backend(config: &AppConfig) -> StorageBackend {
    let remote: Arc<dyn RemoteStorage> = match config.effective_remote_provider() {
        Some(RemoteProviderKind::GoogleDrive) => {
            let Some(drive) = config.google_drive.as_ref() else {
                return StorageBackend::LocalOnly;
            };
            match GoogleDriveStorage::new(drive) {
                Ok(storage) => {
                    info!("☁️  Google Drive storage for {}", drive.client_email);
                    Arc::new(storage)
                }
                Err(e) => {
                    error!("❌ Google Drive disabled: {}", e);
                    return StorageBackend::LocalOnly;
                }
            }
        }
        Some(RemoteProviderKind::S3) => {
            let Some(s3) = config.s3.as_ref() else {
                return StorageBackend::LocalOnly;
            };
            Arc::new(S3RemoteStorage::from_config(s3).await)
        }
        None => {
            info!("💾 Remote storage not configured, summaries are stored locally");
            return StorageBackend::LocalOnly;
        }
    };

    match remote.verify().await {
        Ok(()) => info!("✅ Remote storage '{}' is reachable", remote.provider_id()),
        Err(e) => warn!(
            "⚠️  Remote storage '{}' check failed, uploads may fall back to local: {}",
            remote.provider_id(),
            e
        ),
    }

    StorageBackend::RemoteWithFallback(remote)
}

pub async fn setup_placement(
    config: &AppConfig,
    backend: StorageBackend,
) -> anyhow::Result<PlacementResolver> {
    let local = LocalStore::open(&config.upload_dir).await?;
    info!(
        "📁 Uploads directory: {} (backend: {})",
        config.upload_dir.display(),
        backend.describe()
    );

    Ok(PlacementResolver::new(
        local,
        backend,
        Duration::from_secs(config.remote_timeout_secs),
    ))
}
