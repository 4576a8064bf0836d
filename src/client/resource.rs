//! REST client for plan resources.
//!
//! Every resource kind is served under its own collection path:
//! `GET/POST /{path}` and `GET/PUT/DELETE /{path}/{id}`.

use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;

use super::error::ApiError;
use crate::schema::PlanResource;

/// CRUD operations for one resource kind.
pub trait ResourceClient<R: PlanResource>: Send + Sync {
    fn list_all(&self) -> impl Future<Output = Result<Vec<R>, ApiError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<R, ApiError>> + Send;

    /// Creates a resource; the backend assigns its id.
    fn create(&self, payload: &R) -> impl Future<Output = Result<R, ApiError>> + Send;

    fn update(&self, id: i64, payload: &R) -> impl Future<Output = Result<R, ApiError>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// [`ResourceClient`] backed by HTTP/JSON.
pub struct HttpResourceClient<R> {
    http: reqwest::Client,
    base_url: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for HttpResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: PlanResource> HttpResourceClient<R> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client sharing an existing connection pool.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: normalize_base_url(&base_url.into()),
            _resource: PhantomData,
        }
    }

    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, R::SCHEMA.path)
    }

    pub fn member_url(&self, id: i64) -> String {
        format!("{}/{}/{}", self.base_url, R::SCHEMA.path, id)
    }
}

impl<R: PlanResource> ResourceClient<R> for HttpResourceClient<R> {
    async fn list_all(&self) -> Result<Vec<R>, ApiError> {
        let url = self.collection_url();
        tracing::debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    async fn get(&self, id: i64) -> Result<R, ApiError> {
        let url = self.member_url(id);
        tracing::debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    async fn create(&self, payload: &R) -> Result<R, ApiError> {
        let url = self.collection_url();
        tracing::debug!("POST {}", url);
        let response = self.http.post(&url).json(payload).send().await?;
        read_json(response).await
    }

    async fn update(&self, id: i64, payload: &R) -> Result<R, ApiError> {
        let url = self.member_url(id);
        tracing::debug!("PUT {}", url);
        let body = payload.clone().with_id(id);
        let response = self.http.put(&url).json(&body).send().await?;
        read_json(response).await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let url = self.member_url(id);
        tracing::debug!("DELETE {}", url);
        let response = self.http.delete(&url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Returns the response if its status is a success, otherwise an error
/// carrying the status and body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, body))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

/// Adds a scheme when missing and strips trailing slashes.
pub(crate) fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
