use super::{RemoteObject, RemoteStorage, RemoteStorageError};
use crate::config::GoogleDriveConfig;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tokio::sync::RwLock;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    web_view_link: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Google Drive through a service account (JWT bearer grant).
pub struct GoogleDriveStorage {
    client_email: String,
    folder_id: Option<String>,
    signing_key: EncodingKey,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl GoogleDriveStorage {
    pub fn new(config: &GoogleDriveConfig) -> Result<Self, RemoteStorageError> {
        let signing_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| RemoteStorageError::Auth(format!("Invalid service account key: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client_email: config.client_email.clone(),
            folder_id: config.folder_id.clone(),
            signing_key,
            http,
            token: RwLock::new(None),
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, RemoteStorageError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DRIVE_SCOPE,
            aud: TOKEN_URL,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| RemoteStorageError::Auth(format!("Failed to sign assertion: {}", e)))
    }

    async fn access_token(&self) -> Result<String, RemoteStorageError> {
        let now = Utc::now();
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > now + Duration::seconds(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT.to_string()),
                ("assertion", self.assertion(now)?),
            ])
            .send()
            .await?;
        let response = check_status(response).await.map_err(|e| match e {
            RemoteStorageError::Api { status, message } => {
                RemoteStorageError::Auth(format!("token endpoint returned {}: {}", status, message))
            }
            other => other,
        })?;

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });

        tracing::debug!("🔑 Refreshed Google Drive access token");
        Ok(access_token)
    }

    async fn share_with_anyone(&self, token: &str, file_id: &str) -> Result<(), RemoteStorageError> {
        let response = self
            .http
            .post(format!("{}/{}/permissions", FILES_URL, file_id))
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStorage for GoogleDriveStorage {
    fn provider_id(&self) -> &'static str {
        "google_drive"
    }

    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<RemoteObject, RemoteStorageError> {
        let token = self.access_token().await?;
        let data = tokio::fs::read(path).await?;

        let mut metadata = json!({ "name": file_name });
        if let Some(folder_id) = &self.folder_id {
            metadata["parents"] = json!([folder_id]);
        }

        let boundary = format!("studyhub-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, mime_type, &data);

        let response = self
            .http
            .post(UPLOAD_URL)
            .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
            .bearer_auth(&token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;
        let file: DriveFile = check_status(response).await?.json().await?;

        // An object nobody can open is useless as a download target
        if let Err(e) = self.share_with_anyone(&token, &file.id).await {
            tracing::warn!("Sharing Drive file {} failed, removing it: {}", file.id, e);
            if let Err(delete_err) = self.delete(&file.id).await {
                tracing::error!(
                    "Failed to remove unshared Drive file {}: {}",
                    file.id,
                    delete_err
                );
            }
            return Err(e);
        }

        let url = file
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id));

        Ok(RemoteObject { id: file.id, url })
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteStorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(format!("{}/{}", FILES_URL, id))
            .bearer_auth(&token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn verify(&self) -> Result<(), RemoteStorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(FILES_URL)
            .query(&[("pageSize", "1"), ("fields", "files(id)")])
            .bearer_auth(&token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Body for Drive's `uploadType=multipart`: a JSON metadata part followed by
/// the media part.
fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    data: &[u8],
) -> Bytes {
    let metadata = metadata.to_string();
    let mut body = BytesMut::with_capacity(data.len() + metadata.len() + 256);

    body.put_slice(format!("--{}\r\n", boundary).as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(metadata.as_bytes());
    body.put_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.put_slice(data);
    body.put_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    body.freeze()
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteStorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or(text);

    Err(RemoteStorageError::Api {
        status: status.as_u16(),
        message,
    })
}
