//! File uploads to the storage service.

use serde_json::Value;
use std::future::Future;
use std::path::Path;

use super::error::ApiError;
use super::resource::{check_status, normalize_base_url};

/// A file read into memory, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Builds an upload, guessing the content type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// Sends a file to storage and returns a URL other entities can reference.
pub trait UploadClient: Send + Sync + 'static {
    fn upload(&self, file: UploadFile) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// [`UploadClient`] posting a multipart form with a single `file` part.
#[derive(Debug, Clone)]
pub struct HttpUploadClient {
    http: reqwest::Client,
    url: String,
}

impl HttpUploadClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: normalize_base_url(&url.into()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl UploadClient for HttpUploadClient {
    async fn upload(&self, file: UploadFile) -> Result<String, ApiError> {
        tracing::debug!(
            "Uploading {} ({} bytes) to {}",
            file.file_name,
            file.bytes.len(),
            self.url
        );

        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.http.post(&self.url).multipart(form).send().await?;
        let body = check_status(response).await?.text().await?;
        parse_reference(&body)
    }
}

/// Extracts the file URL from an upload response.
///
/// Accepts a JSON string, a JSON object with `url` or `fileUrl`, or a plain
/// text body.
pub(crate) fn parse_reference(body: &str) -> Result<String, ApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ApiError::Decode("empty upload response".to_string()));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(url)) => Ok(url),
        Ok(Value::Object(object)) => ["url", "fileUrl"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode(format!("no url in upload response: {}", body))),
        Ok(_) => Err(ApiError::Decode(format!(
            "unexpected upload response: {}",
            body
        ))),
        Err(_) => Ok(body.to_string()),
    }
}
