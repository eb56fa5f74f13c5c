//! Backend API resources
//!
//! The views only depend on the traits in this module. [`RestClient`] is the
//! HTTP implementation used by the server binary.

use crate::error::ResourceError;
use crate::model::{AccountingRecord, ApplicationEntry};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// The accounting collection
#[async_trait]
pub trait AccountingResource: Send + Sync {
    async fn list(&self) -> Result<Vec<AccountingRecord>, ResourceError>;

    /// `DELETE /accounting/{id}`
    async fn delete(&self, id: &str) -> Result<(), ResourceError>;
}

/// Applications available to the current user and their containers
#[async_trait]
pub trait ApplicationResource: Send + Sync {
    async fn list(&self) -> Result<Vec<ApplicationEntry>, ResourceError>;

    /// Ask the backend to start a container for an application
    async fn start(&self, mapping_id: &str) -> Result<(), ResourceError>;

    /// Ask the backend to stop and remove a running container
    async fn stop(&self, url_id: &str) -> Result<(), ResourceError>;
}

/// JSON-over-HTTP client for the backend API
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl RestClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ResourceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResourceError::Transport {
                url: base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            token,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a collection, or for one item when `id` is given
    fn url(&self, collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, collection, urlencoding::encode(id)),
            None => format!("{}/{}", self.base_url, collection),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ResourceError> {
        debug!(%method, %url, "Backend request");

        let mut request = self.http_client.request(method.clone(), &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| ResourceError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResourceError::Status {
                method: method.to_string(),
                url,
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ResourceError> {
        let response = self.send(Method::GET, url.clone(), None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ResourceError::Decode {
                url,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl AccountingResource for RestClient {
    async fn list(&self) -> Result<Vec<AccountingRecord>, ResourceError> {
        self.get_json(self.url("accounting", None)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ResourceError> {
        self.send(Method::DELETE, self.url("accounting", Some(id)), None)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ApplicationResource for RestClient {
    async fn list(&self) -> Result<Vec<ApplicationEntry>, ResourceError> {
        self.get_json(self.url("applications", None)).await
    }

    async fn start(&self, mapping_id: &str) -> Result<(), ResourceError> {
        let body = serde_json::json!({ "mapping_id": mapping_id });
        self.send(Method::POST, self.url("containers", None), Some(body))
            .await
            .map(|_| ())
    }

    async fn stop(&self, url_id: &str) -> Result<(), ResourceError> {
        self.send(Method::DELETE, self.url("containers", Some(url_id)), None)
            .await
            .map(|_| ())
    }
}
