//! Test utilities for switch-session
//!
//! Provides a simulated device speaking the login, capability probe and logout
//! endpoints, served on a local port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::connection::{DeviceEndpoint, Scheme};
use crate::connector::ConnectOptions;
use crate::error::Result;

/// How the simulated device answers `POST /rest/v1/login`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginBehavior {
    /// Issue a session cookie when the credentials match
    Accept,
    /// Like `Accept`, but the cookie carries no `Path` attribute
    AcceptWithoutPath,
    /// Answer with this status
    Reject(u16),
    /// Answer 200 without setting a cookie
    NoCookie,
}

/// How the simulated device answers `GET /rest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeBehavior {
    /// Report this latest version
    Version(String),
    /// Answer with this status
    Status(u16),
    /// Answer 200 with a body lacking `latest.version`
    Malformed,
}

/// How the simulated device answers `POST /rest/v1/logout`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutBehavior {
    Accept,
    Status(u16),
}

/// Request counters of a [`SimulatedDevice`]
#[derive(Debug, Default)]
pub struct CallCounts {
    login: AtomicUsize,
    probe: AtomicUsize,
    logout: AtomicUsize,
    resource: AtomicUsize,
}

impl CallCounts {
    pub fn login(&self) -> usize {
        self.login.load(Ordering::SeqCst)
    }

    pub fn probe(&self) -> usize {
        self.probe.load(Ordering::SeqCst)
    }

    pub fn logout(&self) -> usize {
        self.logout.load(Ordering::SeqCst)
    }

    pub fn resource(&self) -> usize {
        self.resource.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.login() + self.probe() + self.logout() + self.resource()
    }
}

struct DeviceState {
    username: String,
    password: String,
    login: LoginBehavior,
    probe: ProbeBehavior,
    logout: RwLock<LogoutBehavior>,
    sessions: RwLock<Vec<String>>,
    next_session: AtomicUsize,
    counts: Arc<CallCounts>,
}

impl DeviceState {
    fn authenticated(&self, headers: &HeaderMap) -> bool {
        let Some(cookie) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let sessions = self.sessions.read();
        cookie
            .split(';')
            .map(str::trim)
            .any(|pair| sessions.iter().any(|s| pair == format!("id={}", s)))
    }
}

/// Builder for a simulated switch REST API
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    username: String,
    password: String,
    login: LoginBehavior,
    probe: ProbeBehavior,
    logout: LogoutBehavior,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "secret".to_string(),
            login: LoginBehavior::Accept,
            probe: ProbeBehavior::Version("10.09".to_string()),
            logout: LogoutBehavior::Accept,
        }
    }
}

impl SimulatedDevice {
    /// Device accepting `admin` / `secret` and reporting version `10.09`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn login(mut self, behavior: LoginBehavior) -> Self {
        self.login = behavior;
        self
    }

    pub fn probe(mut self, behavior: ProbeBehavior) -> Self {
        self.probe = behavior;
        self
    }

    pub fn logout(mut self, behavior: LogoutBehavior) -> Self {
        self.logout = behavior;
        self
    }

    /// Build the router and its call counters
    pub fn into_router(self) -> (Router, Arc<CallCounts>, DeviceControl) {
        let counts = Arc::new(CallCounts::default());
        let state = Arc::new(DeviceState {
            username: self.username,
            password: self.password,
            login: self.login,
            probe: self.probe,
            logout: RwLock::new(self.logout),
            sessions: RwLock::new(Vec::new()),
            next_session: AtomicUsize::new(1),
            counts: counts.clone(),
        });

        let router = Router::new()
            .route("/rest", get(probe_handler))
            .route("/rest/v1/login", post(login_handler))
            .route("/rest/v1/logout", post(logout_handler))
            .route("/rest/v1/system", get(system_handler))
            .with_state(state.clone());

        (router, counts, DeviceControl { state })
    }
}

/// Runtime handle to change device behavior after start
#[derive(Clone)]
pub struct DeviceControl {
    state: Arc<DeviceState>,
}

impl DeviceControl {
    pub fn set_logout(&self, behavior: LogoutBehavior) {
        *self.state.logout.write() = behavior;
    }

    /// Number of sessions currently open on the device
    pub fn open_sessions(&self) -> usize {
        self.state.sessions.read().len()
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_handler(
    State(state): State<Arc<DeviceState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    state.counts.login.fetch_add(1, Ordering::SeqCst);

    match &state.login {
        LoginBehavior::Reject(status) => status_response(*status),
        LoginBehavior::NoCookie => StatusCode::OK.into_response(),
        LoginBehavior::Accept | LoginBehavior::AcceptWithoutPath => {
            if form.username != state.username || form.password != state.password {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            let n = state.next_session.fetch_add(1, Ordering::SeqCst);
            let token = format!("session-{}", n);
            state.sessions.write().push(token.clone());
            let cookie = if state.login == LoginBehavior::AcceptWithoutPath {
                format!("id={}; HttpOnly", token)
            } else {
                format!("id={}; Path=/; HttpOnly", token)
            };
            (StatusCode::OK, [(header::SET_COOKIE, cookie)]).into_response()
        }
    }
}

async fn probe_handler(State(state): State<Arc<DeviceState>>, headers: HeaderMap) -> Response {
    state.counts.probe.fetch_add(1, Ordering::SeqCst);

    if !state.authenticated(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match &state.probe {
        ProbeBehavior::Version(version) => Json(serde_json::json!({
            "latest": {
                "version": version,
                "prefix": format!("/rest/v{}", version),
            },
            "v1": { "version": "v1", "prefix": "/rest/v1" },
        }))
        .into_response(),
        ProbeBehavior::Status(status) => status_response(*status),
        ProbeBehavior::Malformed => {
            Json(serde_json::json!({ "release": "unknown" })).into_response()
        }
    }
}

async fn logout_handler(State(state): State<Arc<DeviceState>>, headers: HeaderMap) -> Response {
    state.counts.logout.fetch_add(1, Ordering::SeqCst);

    if !state.authenticated(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let behavior = state.logout.read().clone();
    match behavior {
        LogoutBehavior::Accept => {
            let cookie = headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            state
                .sessions
                .write()
                .retain(|s| !cookie.contains(&format!("id={}", s)));
            StatusCode::OK.into_response()
        }
        LogoutBehavior::Status(status) => status_response(status),
    }
}

async fn system_handler(State(state): State<Arc<DeviceState>>, headers: HeaderMap) -> Response {
    state.counts.resource.fetch_add(1, Ordering::SeqCst);

    if !state.authenticated(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(serde_json::json!({ "hostname": "sim-switch", "platform_name": "simulated" }))
        .into_response()
}

fn status_response(status: u16) -> Response {
    StatusCode::from_u16(status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

/// A simulated device served locally that shuts down when dropped
pub struct TestDevice {
    pub addr: SocketAddr,
    pub counts: Arc<CallCounts>,
    pub control: DeviceControl,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestDevice {
    /// Serve `device` on an ephemeral port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use switch_session::testing::{SimulatedDevice, TestDevice};
    ///
    /// let device = TestDevice::start(SimulatedDevice::new()).await?;
    /// let connection = connector.connect(device.connect_options()).await?;
    /// ```
    pub async fn start(device: SimulatedDevice) -> std::io::Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (router, counts, control) = device.into_router();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            counts,
            control,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Plain-HTTP endpoint of the device
    pub fn endpoint(&self) -> Result<DeviceEndpoint> {
        DeviceEndpoint::with_scheme(self.addr.ip().to_string(), self.addr.port(), Scheme::Http)
    }

    /// Connect options pointing at the device (no credentials set)
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(self.addr.ip().to_string())
            .port(self.addr.port())
            .scheme(Scheme::Http)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestDevice {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_device_binds_ephemeral_port() {
        let device = TestDevice::start(SimulatedDevice::new()).await.unwrap();
        assert_ne!(device.addr.port(), 0);
        assert_eq!(device.endpoint().unwrap().scheme(), Scheme::Http);
        assert_eq!(device.counts.total(), 0);
        device.shutdown().await;
    }
}
