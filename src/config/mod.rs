use std::env;
use std::path::PathBuf;

/// Which remote store to push uploads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteProviderKind {
    GoogleDrive,
    S3,
}

impl RemoteProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "google_drive" | "gdrive" | "drive" => Some(Self::GoogleDrive),
            "s3" | "minio" => Some(Self::S3),
            _ => None,
        }
    }
}

/// Service-account credentials for Google Drive
#[derive(Debug, Clone)]
pub struct GoogleDriveConfig {
    pub client_email: String,
    /// PEM encoded RSA key, with `\n` escapes already expanded
    pub private_key: String,
    pub folder_id: Option<String>,
}

impl GoogleDriveConfig {
    /// Drive is only considered configured when both the client email and the
    /// private key are present.
    pub fn from_env() -> Option<Self> {
        let client_email = non_empty_var("GOOGLE_DRIVE_CLIENT_EMAIL")?;
        let private_key = non_empty_var("GOOGLE_DRIVE_PRIVATE_KEY")?;

        Some(Self {
            client_email,
            private_key: private_key.replace("\\n", "\n"),
            folder_id: non_empty_var("GOOGLE_DRIVE_FOLDER_ID"),
        })
    }
}

/// S3 compatible bucket used as the remote store
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Base URL under which objects of the bucket are publicly reachable
    pub public_url: String,
}

impl S3Config {
    pub fn from_env() -> Option<Self> {
        let endpoint = non_empty_var("S3_ENDPOINT")?;
        let bucket = non_empty_var("S3_BUCKET")?;
        let public_url = non_empty_var("S3_PUBLIC_URL")
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));

        Some(Self {
            access_key: non_empty_var("S3_ACCESS_KEY")?,
            secret_key: non_empty_var("S3_SECRET_KEY")?,
            endpoint,
            bucket,
            public_url,
        })
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum upload size in bytes (default: 10 MiB)
    pub max_file_size: usize,

    /// Directory holding in-flight uploads (default: "./staging")
    pub staging_dir: PathBuf,

    /// Permanent local storage, served as `uploads/<name>` (default: "./uploads")
    pub upload_dir: PathBuf,

    /// Explicit remote provider; `None` means auto-detect from credentials
    pub remote_provider: Option<RemoteProviderKind>,

    /// Upper bound for one remote push in seconds (default: 30)
    pub remote_timeout_secs: u64,

    pub google_drive: Option<GoogleDriveConfig>,

    pub s3: Option<S3Config>,

    /// JWT Secret Key
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Rate limit: uploads per hour per user (default: 50)
    pub uploads_per_hour: u32,

    /// Rate limit: summary edits per hour per user (default: 30)
    pub updates_per_hour: u32,

    /// Staged files older than this are swept (default: 1)
    pub staging_cleanup_age_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10 MiB
            staging_dir: PathBuf::from("./staging"),
            upload_dir: PathBuf::from("./uploads"),
            remote_provider: None,
            remote_timeout_secs: 30,
            google_drive: None,
            s3: None,
            jwt_secret: String::new(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(), // Vite default
                "http://localhost:3000".to_string(),
            ],
            uploads_per_hour: 50,
            updates_per_hour: 30,
            staging_cleanup_age_hours: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables. `JWT_SECRET` has no
    /// default outside of [`AppConfig::development`].
    pub fn from_env() -> anyhow::Result<Self> {
        let default = Self::default();

        let jwt_secret = non_empty_var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("CRITICAL: JWT_SECRET must be set"))?;

        Ok(Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            remote_provider: env::var("REMOTE_STORAGE_PROVIDER")
                .ok()
                .and_then(|v| RemoteProviderKind::parse(&v)),

            remote_timeout_secs: env::var("REMOTE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.remote_timeout_secs),

            google_drive: GoogleDriveConfig::from_env(),

            s3: S3Config::from_env(),

            jwt_secret,

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),

            uploads_per_hour: env::var("UPLOADS_PER_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.uploads_per_hour),

            updates_per_hour: env::var("UPDATES_PER_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.updates_per_hour),

            staging_cleanup_age_hours: env::var("STAGING_CLEANUP_AGE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.staging_cleanup_age_hours),
        })
    }

    /// Create config for development and tests (local storage, relaxed limits)
    pub fn development() -> Self {
        Self {
            jwt_secret: "secret".to_string(),
            uploads_per_hour: 1000,
            updates_per_hour: 1000,
            ..Self::default()
        }
    }

    /// The remote provider to wire up, if any. An explicit choice wins;
    /// otherwise Drive is preferred over S3 when both have credentials.
    pub fn effective_remote_provider(&self) -> Option<RemoteProviderKind> {
        match &self.remote_provider {
            Some(RemoteProviderKind::GoogleDrive) if self.google_drive.is_some() => {
                Some(RemoteProviderKind::GoogleDrive)
            }
            Some(RemoteProviderKind::S3) if self.s3.is_some() => Some(RemoteProviderKind::S3),
            Some(_) => None,
            None if self.google_drive.is_some() => Some(RemoteProviderKind::GoogleDrive),
            None if self.s3.is_some() => Some(RemoteProviderKind::S3),
            None => None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
