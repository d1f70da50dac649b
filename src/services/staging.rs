use crate::services::error::UploadError;
use crate::utils::validation::{is_executable_content, normalize_allowed_mime, staged_extension};
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Bytes inspected for executable signatures
const SNIFF_LEN: usize = 262;
const READ_BUFFER: usize = 64 * 1024;

/// Directory where uploads live while their final placement is decided.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    max_size: u64,
}

/// A fully written upload in the staging directory.
///
/// The value owns its file: dropping it deletes the file unless it was handed
/// off through [`StagedFile::relocate`] or removed through
/// [`StagedFile::discard`].
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    path: PathBuf,
    original_filename: String,
    mime_type: &'static str,
    size: u64,
    sha256: String,
    armed: bool,
}

impl StagingArea {
    pub async fn open(dir: impl Into<PathBuf>, max_size: u64) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, max_size })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Streams an upload into a uniquely named staging file.
    ///
    /// The declared MIME type is checked before anything touches the disk.
    /// On any failure the partially written file is removed.
    pub async fn stage<R>(
        &self,
        original_filename: &str,
        declared_mime: Option<&str>,
        reader: R,
    ) -> Result<StagedFile, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let declared = declared_mime.unwrap_or("application/octet-stream");
        let mime_type = normalize_allowed_mime(declared)
            .ok_or_else(|| UploadError::UnsupportedMediaType(declared.to_string()))?;

        let name = generate_staged_name(original_filename, mime_type);
        let path = self.dir.join(&name);

        // create_new: a name collision must never clobber another request's file
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let mut staged = StagedFile {
            name,
            path,
            original_filename: original_filename.to_string(),
            mime_type,
            size: 0,
            sha256: String::new(),
            armed: true,
        };

        let (size, sha256) = self.copy_limited(file, reader).await?;
        staged.size = size;
        staged.sha256 = sha256;

        tracing::debug!(
            "📥 Staged {} ({} bytes, {}) as {}",
            staged.original_filename,
            staged.size,
            staged.mime_type,
            staged.name
        );

        Ok(staged)
    }

    async fn copy_limited<R>(&self, mut file: File, mut reader: R) -> Result<(u64, String), UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = vec![0u8; READ_BUFFER];
        let mut head: Vec<u8> = Vec::with_capacity(SNIFF_LEN);
        let mut sniffed = false;
        let mut hasher = Sha256::new();
        let mut total: u64 = 0;

        loop {
            let n = reader
                .read(&mut buffer)
                .await
                .map_err(|e| classify_read_error(e, total, self.max_size))?;
            if n == 0 {
                break;
            }

            total += n as u64;
            if total > self.max_size {
                return Err(UploadError::PayloadTooLarge {
                    size: total,
                    limit: self.max_size,
                });
            }

            if !sniffed {
                let take = (SNIFF_LEN - head.len()).min(n);
                head.extend_from_slice(&buffer[..take]);
                if head.len() >= SNIFF_LEN {
                    reject_executable(&head)?;
                    sniffed = true;
                }
            }

            hasher.update(&buffer[..n]);
            file.write_all(&buffer[..n]).await?;
        }

        if total == 0 {
            return Err(UploadError::Validation("הקובץ ריק".to_string()));
        }
        if !sniffed {
            reject_executable(&head)?;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok((total, hex::encode(hasher.finalize())))
    }

    /// Deletes staged files older than `max_age`. Only leftovers of crashed
    /// processes are old enough to match.
    pub async fn sweep(&self, max_age: Duration) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or_default();

            if age >= max_age {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!(
                        "Failed to sweep staged file {}: {}",
                        entry.path().display(),
                        e
                    ),
                }
            }
        }

        Ok(removed)
    }
}

impl StagedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Deletes the staged copy (its bytes now live elsewhere).
    pub async fn discard(mut self) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                self.armed = false;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.armed = false;
                Ok(())
            }
            // stays armed; drop retries
            Err(e) => Err(e),
        }
    }

    /// Moves the staged file to `dest`. A rename is used; copying only
    /// happens when staging and destination are on different filesystems.
    /// On failure the staged file is deleted when `self` drops.
    pub async fn relocate(mut self, dest: &Path) -> io::Result<()> {
        match fs::rename(&self.path, dest).await {
            Ok(()) => {
                self.armed = false;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                let source = File::open(&self.path).await?;
                copy_into(source, dest).await?;
                if fs::remove_file(&self.path).await.is_ok() {
                    self.armed = false;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Writes `reader` into a new file at `dest`. A failed copy leaves nothing
/// behind at `dest`.
async fn copy_into<R: AsyncRead + Unpin>(mut reader: R, dest: &Path) -> io::Result<u64> {
    let result = async {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .await?;
        let copied = tokio::io::copy(&mut reader, &mut file).await?;
        file.sync_all().await?;
        Ok(copied)
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(dest).await;
    }
    result
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("🧹 Removed staged file {}", self.name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove staged file {}: {}", self.path.display(), e),
        }
    }
}

/// `summary-<unix millis>-<random>.<ext>`
pub fn generate_staged_name(original_filename: &str, mime_type: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!(
        "summary-{}-{}.{}",
        Utc::now().timestamp_millis(),
        suffix,
        staged_extension(original_filename, mime_type)
    )
}

fn reject_executable(head: &[u8]) -> Result<(), UploadError> {
    if is_executable_content(head) {
        return Err(UploadError::UnsupportedMediaType(
            "executable content".to_string(),
        ));
    }
    Ok(())
}

fn classify_read_error(e: io::Error, read_so_far: u64, limit: u64) -> UploadError {
    if e.to_string().contains("length limit exceeded") {
        UploadError::PayloadTooLarge {
            size: read_so_far,
            limit,
        }
    } else {
        UploadError::Interrupted(e.to_string())
    }
}
