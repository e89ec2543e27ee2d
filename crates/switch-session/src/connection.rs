//! Connection record and its building blocks

use std::fmt;
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SessionError};
use crate::transport::TransportOptions;

/// Default HTTPS port of the device REST API
pub const DEFAULT_PORT: u16 = 443;

/// URL scheme used to reach the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    /// Plain HTTP, for lab setups and simulated devices
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

/// Address of a device REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    server: String,
    port: u16,
    scheme: Scheme,
}

impl DeviceEndpoint {
    /// HTTPS endpoint; rejects an empty server or port 0
    pub fn new(server: impl Into<String>, port: u16) -> Result<Self> {
        Self::with_scheme(server, port, Scheme::Https)
    }

    pub fn with_scheme(server: impl Into<String>, port: u16, scheme: Scheme) -> Result<Self> {
        let server = server.into().trim().to_string();
        if server.is_empty() {
            return Err(SessionError::InvalidEndpoint("server is required".into()));
        }
        if port == 0 {
            return Err(SessionError::InvalidEndpoint("port must be in 1-65535".into()));
        }
        let endpoint = Self {
            server,
            port,
            scheme,
        };
        endpoint.base_url()?;
        Ok(endpoint)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// `{scheme}://{server}:{port}/`
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}:{}/", self.scheme.as_str(), self.server, self.port);
        Url::parse(&raw).map_err(|e| SessionError::InvalidEndpoint(format!("{}: {}", raw, e)))
    }

    /// Resolve `path` against the endpoint root
    pub fn url(&self, path: &str) -> Result<Url> {
        let base = self.base_url()?;
        base.join(path.trim_start_matches('/'))
            .map_err(|e| SessionError::InvalidEndpoint(format!("{}: {}", path, e)))
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server, self.port)
    }
}

/// Session cookie issued by the device at login
///
/// Holds the `Cookie` header value and the jar the client presents it from.
#[derive(Clone)]
pub struct SessionHandle {
    cookie: String,
    jar: Arc<Jar>,
}

impl SessionHandle {
    /// Returns `None` for an empty cookie
    pub fn new(cookie: impl Into<String>, jar: Arc<Jar>) -> Option<Self> {
        let cookie = cookie.into();
        if cookie.trim().is_empty() {
            None
        } else {
            Some(Self { cookie, jar })
        }
    }

    /// `Cookie` header value carrying the session
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.cookie == other.cookie
    }
}

impl Eq for SessionHandle {}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("cookie", &"****")
            .finish()
    }
}

/// Release descriptor from the capability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRelease {
    pub version: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Body of `GET /rest`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiVersions {
    pub latest: ApiRelease,
}

/// A negotiated session against one device
///
/// Only produced by a successful login and capability probe; never mutated
/// afterwards.
#[derive(Clone)]
pub struct Connection {
    endpoint: DeviceEndpoint,
    session: SessionHandle,
    transport: TransportOptions,
    release: ApiRelease,
    client: Client,
}

impl Connection {
    pub(crate) fn new(
        endpoint: DeviceEndpoint,
        session: SessionHandle,
        transport: TransportOptions,
        release: ApiRelease,
        client: Client,
    ) -> Self {
        Self {
            endpoint,
            session,
            transport,
            release,
            client,
        }
    }

    pub fn server(&self) -> &str {
        self.endpoint.server()
    }

    pub fn port(&self) -> u16 {
        self.endpoint.port()
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.transport
    }

    /// Latest API version reported by the device
    pub fn api_version(&self) -> &str {
        &self.release.version
    }

    /// Path prefix of the latest API release, when the device reports one
    pub fn api_prefix(&self) -> Option<&str> {
        self.release.prefix.as_deref()
    }

    /// HTTP client carrying the session cookie and transport options
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Serializable summary, without the session
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            server: self.server().to_string(),
            port: self.port(),
            api_version: self.api_version().to_string(),
            api_prefix: self.api_prefix().map(String::from),
            skip_certificate_check: self.transport.accept_invalid_certs,
            runtime: self.transport.runtime,
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
            && self.session == other.session
            && self.transport == other.transport
            && self.release == other.release
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("session", &self.session)
            .field("transport", &self.transport)
            .field("release", &self.release)
            .finish()
    }
}

/// Display form of a [`Connection`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub server: String,
    pub port: u16,
    pub api_version: String,
    pub api_prefix: Option<String>,
    pub skip_certificate_check: bool,
    pub runtime: crate::transport::RuntimeCapability,
}

/// Connection built without a device, for unit tests
#[cfg(test)]
pub(crate) fn test_connection(server: &str, cookie: &str) -> Arc<Connection> {
    use crate::transport::RuntimeCapability;

    let session = SessionHandle::new(cookie, Arc::new(Jar::default())).unwrap();
    Arc::new(Connection::new(
        DeviceEndpoint::new(server, DEFAULT_PORT).unwrap(),
        session,
        TransportOptions {
            runtime: RuntimeCapability::Modern,
            accept_invalid_certs: false,
            keep_alive: true,
            basic_parsing: false,
            min_tls: None,
        },
        ApiRelease {
            version: "10.09".to_string(),
            prefix: None,
        },
        Client::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let ep = DeviceEndpoint::new("switch.example.com", DEFAULT_PORT).unwrap();
        assert_eq!(
            ep.url("/rest/v1/login").unwrap().as_str(),
            "https://switch.example.com/rest/v1/login"
        );
        assert_eq!(
            ep.url("rest").unwrap().as_str(),
            "https://switch.example.com/rest"
        );

        let ep = DeviceEndpoint::with_scheme("10.0.0.1", 8443, Scheme::Http).unwrap();
        assert_eq!(ep.base_url().unwrap().as_str(), "http://10.0.0.1:8443/");
        assert_eq!(ep.to_string(), "10.0.0.1:8443");
    }

    #[test]
    fn test_endpoint_rejects_bad_input() {
        assert!(matches!(
            DeviceEndpoint::new("", 443),
            Err(SessionError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            DeviceEndpoint::new("sw1", 0),
            Err(SessionError::InvalidEndpoint(_))
        ));
        assert!(DeviceEndpoint::new("bad host name", 443).is_err());
    }

    #[test]
    fn test_session_handle_rejects_empty() {
        let jar = Arc::new(Jar::default());
        assert!(SessionHandle::new("", jar.clone()).is_none());
        assert!(SessionHandle::new("  ", jar.clone()).is_none());

        let handle = SessionHandle::new("id=abc", jar).unwrap();
        assert_eq!(handle.cookie(), "id=abc");
        assert!(!format!("{:?}", handle).contains("abc"));
    }

    #[test]
    fn test_equality_ignores_client_identity() {
        let a = test_connection("sw1", "id=1");
        let b = test_connection("sw1", "id=1");
        let c = test_connection("sw1", "id=2");
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
        assert!(!format!("{:?}", a).contains("id=1"));
    }

    #[test]
    fn test_summary_omits_session() {
        let summary = test_connection("sw1", "id=1").summary();
        assert_eq!(summary.server, "sw1");
        assert_eq!(summary.port, DEFAULT_PORT);
        assert_eq!(summary.api_version, "10.09");
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("id=1"));
    }

    #[test]
    fn test_probe_body_shape() {
        let body = r#"{
            "latest": {"version": "10.09", "prefix": "/rest/v10.09"},
            "v1": {"version": "v1"}
        }"#;
        let versions: ApiVersions = serde_json::from_str(body).unwrap();
        assert_eq!(versions.latest.version, "10.09");
        assert_eq!(versions.latest.prefix.as_deref(), Some("/rest/v10.09"));
    }
}
