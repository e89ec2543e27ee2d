//! Login handshake and capability probe

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::connection::{ApiVersions, Connection, DeviceEndpoint, SessionHandle};
use crate::credential::Credential;
use crate::error::{RequestFailure, Result, SessionError};
use crate::transport::TransportOptions;

/// Login endpoint, relative to the device root
pub const LOGIN_PATH: &str = "rest/v1/login";
/// Capability probe endpoint, relative to the device root
pub const PROBE_PATH: &str = "rest";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs login and version discovery against a device
#[derive(Debug, Clone)]
pub struct SessionNegotiator {
    timeout: Duration,
    connect_timeout: Duration,
}

impl SessionNegotiator {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_config(timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout,
        }
    }

    /// Log in and probe the API version.
    ///
    /// Fails with [`SessionError::AuthFailure`] if login does not yield a session
    /// and with [`SessionError::UnsupportedVersion`] if the probe fails for any
    /// reason. Nothing is retried.
    #[instrument(skip(self, credential, transport), fields(username = %credential.username))]
    pub async fn negotiate(
        &self,
        endpoint: &DeviceEndpoint,
        credential: &Credential,
        transport: &TransportOptions,
    ) -> Result<Connection> {
        let jar = Arc::new(Jar::default());
        let client = transport
            .apply(Client::builder(), self.timeout, self.connect_timeout)
            .cookie_provider(jar.clone())
            .build()
            .map_err(SessionError::ClientSetup)?;

        let cookies = self.login(&client, endpoint, credential).await?;

        // Re-scope the session to the device root so every API path carries it
        let root = endpoint.base_url()?;
        for pair in &cookies {
            jar.add_cookie_str(&format!("{}; Path=/", pair), &root);
        }
        let session = SessionHandle::new(cookies.join("; "), jar.clone()).ok_or_else(|| {
            warn!("Login succeeded but no session cookie was issued");
            SessionError::auth_failure(RequestFailure::ParseError(
                "no session cookie in login response".to_string(),
            ))
        })?;

        let release = self.probe(&client, endpoint).await?;
        info!(%endpoint, api_version = %release.version, "Session established");

        Ok(Connection::new(
            endpoint.clone(),
            session,
            transport.clone(),
            release,
            client,
        ))
    }

    /// POST the login form; returns the `name=value` pairs the device set
    async fn login(
        &self,
        client: &Client,
        endpoint: &DeviceEndpoint,
        credential: &Credential,
    ) -> Result<Vec<String>> {
        let url = endpoint.url(LOGIN_PATH)?;
        debug!("Logging in at {}", url);

        let form = [
            ("username", credential.username.as_str()),
            ("password", credential.secret.expose()),
        ];
        let response = client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SessionError::auth_failure(RequestFailure::from(e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Login rejected");
            return Err(SessionError::auth_failure(status_failure(response, status).await));
        }

        let cookies: Vec<String> = response
            .cookies()
            .filter(|c| !c.value().is_empty())
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect();
        debug!(count = cookies.len(), "Login response cookies");
        Ok(cookies)
    }

    async fn probe(
        &self,
        client: &Client,
        endpoint: &DeviceEndpoint,
    ) -> Result<crate::connection::ApiRelease> {
        let url = endpoint.url(PROBE_PATH)?;
        debug!("Probing API versions at {}", url);

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError::unsupported_version(RequestFailure::from(e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Capability probe failed");
            return Err(SessionError::unsupported_version(
                status_failure(response, status).await,
            ));
        }

        let versions: ApiVersions = response.json().await.map_err(|e| {
            SessionError::unsupported_version(RequestFailure::ParseError(e.to_string()))
        })?;
        if versions.latest.version.trim().is_empty() {
            return Err(SessionError::unsupported_version(RequestFailure::ParseError(
                "empty latest.version".to_string(),
            )));
        }
        Ok(versions.latest)
    }
}

impl Default for SessionNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a non-success response into a [`RequestFailure`]
pub(crate) async fn status_failure(
    response: reqwest::Response,
    status: StatusCode,
) -> RequestFailure {
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!("HTTP {}", status),
    };
    RequestFailure::server_error(status.as_u16(), message)
}
