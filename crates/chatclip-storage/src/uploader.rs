//! Upload capability used by the render pipeline.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::client::{R2Client, R2Config};
use crate::error::{StorageError, StorageResult};

/// Content type of rendered videos.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// A stored media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    /// Stable identifier (file stem)
    pub id: String,
    /// Object key inside the bucket
    pub key: String,
    /// Download URL
    pub url: String,
    /// Size in bytes
    pub size: u64,
}

/// Stores a rendered file and hands back a URL for it.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path) -> StorageResult<UploadedMedia>;
}

/// Uploader backed by Cloudflare R2.
#[derive(Clone)]
pub struct R2Uploader {
    client: R2Client,
    key_prefix: String,
    public_base_url: Option<String>,
    presign_ttl: Duration,
}

impl R2Uploader {
    pub fn new(client: R2Client, config: &R2Config) -> Self {
        Self {
            client,
            key_prefix: config.key_prefix.clone(),
            public_base_url: config.public_base_url.clone(),
            presign_ttl: config.presign_ttl(),
        }
    }

    /// Create client and uploader from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let config = R2Config::from_env()?;
        Ok(Self::new(R2Client::new(&config), &config))
    }

    pub fn client(&self) -> &R2Client {
        &self.client
    }

    async fn download_url(&self, key: &str) -> StorageResult<String> {
        match &self.public_base_url {
            Some(base) => Ok(public_url(base, key)),
            None => self.client.presign_get(key, self.presign_ttl).await,
        }
    }
}

#[async_trait]
impl Uploader for R2Uploader {
    async fn upload(&self, path: &Path) -> StorageResult<UploadedMedia> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();

        let size = tokio::fs::metadata(path).await?.len();
        let key = object_key(&self.key_prefix, file_name)?;

        self.client.upload_file(path, &key, VIDEO_CONTENT_TYPE).await?;
        let url = self.download_url(&key).await?;

        info!(key = %key, size, "Stored rendered video");
        Ok(UploadedMedia { id, key, url, size })
    }
}

/// Object key for a file under `prefix`.
pub fn object_key(prefix: &str, file_name: &str) -> StorageResult<String> {
    if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
        return Err(StorageError::InvalidKey(file_name.to_string()));
    }

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(file_name.to_string())
    } else {
        Ok(format!("{}/{}", prefix, file_name))
    }
}

/// Public URL of `key` under a CDN or public bucket origin.
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("renders", "a.mp4").unwrap(), "renders/a.mp4");
        assert_eq!(object_key("/renders/", "a.mp4").unwrap(), "renders/a.mp4");
        assert_eq!(object_key("", "a.mp4").unwrap(), "a.mp4");
    }

    #[test]
    fn test_object_key_rejects_traversal() {
        assert!(object_key("renders", "../a.mp4").is_err());
        assert!(object_key("renders", "x/a.mp4").is_err());
        assert!(object_key("renders", "").is_err());
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("https://cdn.example.com/", "renders/a.mp4"),
            "https://cdn.example.com/renders/a.mp4"
        );
    }

    #[test]
    fn test_uploaded_media_json() {
        let media = UploadedMedia {
            id: "job-1".into(),
            key: "renders/job-1.mp4".into(),
            url: "https://cdn/renders/job-1.mp4".into(),
            size: 10,
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["id"], "job-1");
        assert_eq!(json["size"], 10);
    }
}
