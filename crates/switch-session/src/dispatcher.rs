//! Generic authenticated request dispatch

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::connection::Connection;
use crate::error::RequestFailure;
use crate::negotiator::status_failure;

/// Root of versioned resource paths
pub const API_ROOT: &str = "rest/v1/";

/// Sends authenticated requests on behalf of a [`Connection`]
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Send `method` to `path` with the connection's session.
    ///
    /// Succeeds only on a 2xx response.
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        connection: &Connection,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, RequestFailure>;
}

/// Dispatcher that talks to the device REST API
#[derive(Debug, Clone, Copy, Default)]
pub struct RestDispatcher;

impl RestDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Build the full URL for `path`.
    ///
    /// Paths are relative to `rest/v1/` unless they already start with `rest/`.
    pub fn resolve_url(connection: &Connection, path: &str) -> Result<Url, RequestFailure> {
        let path = path.trim_start_matches('/');
        let base = connection
            .endpoint()
            .base_url()
            .map_err(|e| RequestFailure::ParseError(e.to_string()))?;
        if path.starts_with("rest/") || path == "rest" {
            Ok(base.join(path)?)
        } else {
            Ok(base.join(API_ROOT)?.join(path)?)
        }
    }

    /// Invoke and decode a JSON body
    pub async fn invoke_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        connection: &Connection,
        body: Option<&serde_json::Value>,
    ) -> Result<T, RequestFailure> {
        let response = self.invoke(method, path, connection, body).await?;
        response
            .json()
            .await
            .map_err(|e| RequestFailure::ParseError(e.to_string()))
    }
}

#[async_trait]
impl RequestDispatcher for RestDispatcher {
    #[instrument(skip(self, connection, body), fields(endpoint = %connection.endpoint()))]
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        connection: &Connection,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, RequestFailure> {
        let url = Self::resolve_url(connection, path)?;
        debug!("{} {}", method, url);

        let mut request = connection.http_client().request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(status_failure(response, status).await)
        }
    }
}
