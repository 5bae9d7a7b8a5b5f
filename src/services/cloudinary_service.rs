//! Cloudinary raw-asset storage backend
//!
//! Books are uploaded as `raw` resources under the `books/` folder with the
//! canonical key as public id, so a key always maps to one remote object.
//! The reference handed back is the delivery URL with the `fl_attachment`
//! flag, which makes browsers download instead of render inline.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CloudinaryConfig;
use crate::error::{BookError, Result};
use crate::storage::StorageBackend;

/// Remote folder every book is stored under
pub const BOOKS_FOLDER: &str = "books";

const ATTACHMENT_FLAG: &str = "fl_attachment";
/// Not part of the signed payload
const SIGNATURE_ALGORITHM: &str = "sha256";
const DELIVERY_HOST: &str = "https://res.cloudinary.com";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upload and destroy calls carry the whole payload; allow more than a fetch
const MUTATION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryService {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryService {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        // Validate required fields
        if config.cloud_name.is_empty() {
            return Err(anyhow::anyhow!("Cloud name is required").into());
        }
        if config.api_key.is_empty() {
            return Err(anyhow::anyhow!("API key is required").into());
        }
        if config.api_secret.is_empty() {
            return Err(anyhow::anyhow!("API secret is required").into());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    /// Remote identifier for a canonical key
    pub fn public_id(key: &str) -> String {
        format!("{}/{}", BOOKS_FOLDER, key)
    }

    /// Insert the attachment flag after `/upload/` so the URL forces a download
    pub fn attachment_url(secure_url: &str) -> String {
        if secure_url.contains(&format!("/upload/{}/", ATTACHMENT_FLAG)) {
            return secure_url.to_string();
        }
        secure_url.replacen("/upload/", &format!("/upload/{}/", ATTACHMENT_FLAG), 1)
    }

    /// Delivery URL derived from the key alone, for records without a usable reference
    pub fn delivery_url(&self, key: &str) -> String {
        format!(
            "{}/{}/raw/upload/{}/{}",
            DELIVERY_HOST,
            self.config.cloud_name,
            ATTACHMENT_FLAG,
            Self::public_id(key)
        )
    }

    /// Request signature: params sorted by name, `k=v` joined with `&`, secret
    /// appended, SHA-256 hex digest.
    pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/raw/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Fixed parameters for every upload
    fn upload_params(key: &str, timestamp: i64) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("flags", "attachment".to_string()),
            ("folder", BOOKS_FOLDER.to_string()),
            ("overwrite", "true".to_string()),
            ("public_id", key.to_string()),
            ("timestamp", timestamp.to_string()),
            ("unique_filename", "false".to_string()),
            ("use_filename", "true".to_string()),
        ])
    }

    async fn upstream_error(operation: &str, response: reqwest::Response) -> BookError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        BookError::Upstream(format!("{} failed with HTTP {}: {}", operation, status, message))
    }
}

#[async_trait]
impl StorageBackend for CloudinaryService {
    async fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        info!("Uploading book to Cloudinary: {} ({} bytes)", Self::public_id(key), data.len());

        let params = Self::upload_params(key, Utc::now().timestamp());
        let signature = Self::sign(&params, &self.config.api_secret);

        let file_part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(key.to_string());
        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", SIGNATURE_ALGORITHM);
        for (name, value) in params {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .timeout(MUTATION_TIMEOUT)
            .send()
            .await
            .map_err(|e| BookError::Upstream(format!("Upload of {} failed: {}", key, e)))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error("Upload", response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| BookError::Upstream(format!("Malformed upload response: {}", e)))?;

        debug!("Cloudinary accepted {:?}", uploaded.public_id);
        let reference = Self::attachment_url(&uploaded.secure_url);
        info!("Successfully uploaded {} to {}", key, reference);
        Ok(reference)
    }

    async fn get(&self, key: &str, reference: &str) -> Result<Vec<u8>> {
        let decoded = urlencoding::decode(reference)
            .map(|url| url.into_owned())
            .unwrap_or_else(|_| reference.to_string());

        let url = if self.owns_reference(&decoded) {
            decoded
        } else {
            warn!(
                "Reference '{}' for {} is not a remote URL, deriving the delivery URL from the key",
                reference, key
            );
            self.delivery_url(key)
        };

        info!("Fetching book from Cloudinary: {}", url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.fetch_timeout_seconds))
            .send()
            .await
            .map_err(|e| BookError::Upstream(format!("Failed to download {}: {}", key, e)))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error("Download", response).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BookError::Upstream(format!("Failed to read body for {}: {}", key, e)))?;

        if body.is_empty() {
            return Err(BookError::Upstream(format!("Empty body downloading {}", key)));
        }

        info!("Successfully retrieved {} ({} bytes)", key, body.len());
        Ok(body.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let public_id = Self::public_id(key);
        info!("Deleting book from Cloudinary: {}", public_id);

        let params = BTreeMap::from([
            ("public_id", public_id.clone()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);
        let signature = Self::sign(&params, &self.config.api_secret);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", SIGNATURE_ALGORITHM.to_string()));

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form)
            .timeout(MUTATION_TIMEOUT)
            .send()
            .await
            .map_err(|e| BookError::Upstream(format!("Destroy of {} failed: {}", public_id, e)))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error("Destroy", response).await);
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| BookError::Upstream(format!("Malformed destroy response: {}", e)))?;

        match destroyed.result.as_str() {
            "ok" => {
                info!("Successfully deleted {}", public_id);
                Ok(())
            }
            "not found" => {
                debug!("Nothing to delete for {}", public_id);
                Ok(())
            }
            other => Err(BookError::Upstream(format!(
                "Destroy of {} returned '{}'",
                public_id, other
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = format!(
            "{}/v1_1/{}/resources/raw/upload/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            Self::public_id(key)
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .timeout(Duration::from_secs(self.config.fetch_timeout_seconds))
            .send()
            .await
            .map_err(|e| BookError::Upstream(format!("Existence check for {} failed: {}", key, e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::upstream_error("Existence check", response).await),
        }
    }

    fn owns_reference(&self, reference: &str) -> bool {
        reference.starts_with("https://") || reference.starts_with("http://")
    }

    fn storage_type(&self) -> &'static str {
        "cloudinary"
    }

    async fn initialize(&self) -> Result<()> {
        info!(
            "Cloudinary storage ready: cloud '{}', folder '{}/'",
            self.config.cloud_name, BOOKS_FOLDER
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            fetch_timeout_seconds: 5,
        }
    }

    #[test]
    fn test_new_validates_credentials() {
        let mut config = test_config();
        config.cloud_name.clear();
        let err = CloudinaryService::new(config).unwrap_err();
        assert!(err.to_string().contains("Cloud name is required"));

        let mut config = test_config();
        config.api_secret.clear();
        assert!(CloudinaryService::new(config).is_err());
    }

    #[test]
    fn test_attachment_url_inserts_flag_once() {
        let url = "https://res.cloudinary.com/demo/raw/upload/v1712/books/report.pdf";
        let flagged = CloudinaryService::attachment_url(url);
        assert_eq!(
            flagged,
            "https://res.cloudinary.com/demo/raw/upload/fl_attachment/v1712/books/report.pdf"
        );
        assert_eq!(CloudinaryService::attachment_url(&flagged), flagged);
    }

    #[test]
    fn test_signature_is_order_independent_sha256() {
        let a = BTreeMap::from([("timestamp", "1".to_string()), ("public_id", "books/a.pdf".to_string())]);
        let b = BTreeMap::from([("public_id", "books/a.pdf".to_string()), ("timestamp", "1".to_string())]);
        let sig = CloudinaryService::sign(&a, "secret");
        assert_eq!(sig, CloudinaryService::sign(&b, "secret"));
        assert_eq!(sig.len(), 64);
        assert_ne!(sig, CloudinaryService::sign(&a, "other-secret"));
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let params = BTreeMap::from([("public_id", "books/a.pdf".to_string()), ("timestamp", "1700000000".to_string())]);
        let mut hasher = Sha256::new();
        hasher.update(b"public_id=books/a.pdf&timestamp=1700000000secret");
        assert_eq!(CloudinaryService::sign(&params, "secret"), format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_delivery_url_and_ownership() {
        let service = CloudinaryService::new(test_config()).unwrap();
        assert_eq!(
            service.delivery_url("a.pdf"),
            "https://res.cloudinary.com/demo/raw/upload/fl_attachment/books/a.pdf"
        );
        assert!(service.owns_reference("https://res.cloudinary.com/demo/raw/upload/a.pdf"));
        assert!(!service.owns_reference("/local-files/a.pdf"));
    }
}
