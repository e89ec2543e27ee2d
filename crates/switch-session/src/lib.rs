//! Switch Session Library
//!
//! Manages authenticated sessions against switch REST administration APIs:
//! credential resolution, transport policy, login and capability probe,
//! default-connection registry and logout.
//!
//! # Example
//!
//! ```rust,no_run
//! use switch_session::{ConnectOptions, Connector, CredentialSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let connector = Connector::new();
//!
//!     let connection = connector
//!         .connect(
//!             ConnectOptions::new("switch.example.com")
//!                 .credentials(CredentialSource::pair("admin", "secret")),
//!         )
//!         .await?;
//!     println!("API version {}", connection.api_version());
//!
//!     // Log out without asking, clearing the default connection
//!     connector.disconnect(&connection, true).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Resource requests
//!
//! Other API calls go through a [`RequestDispatcher`] with the connection:
//!
//! ```rust,ignore
//! let system: serde_json::Value = RestDispatcher::new()
//!     .invoke_json(Method::GET, "system", &connection, None)
//!     .await?;
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a simulated device:
//!
//! ```rust,ignore
//! use switch_session::testing::{SimulatedDevice, TestDevice};
//!
//! let device = TestDevice::start(SimulatedDevice::new()).await?;
//! let connection = connector.connect(device.connect_options()).await?;
//! ```

mod connection;
mod connector;
mod credential;
mod dispatcher;
mod error;
mod negotiator;
mod registry;
mod terminator;
pub mod testing;
mod transport;

pub use connection::{
    ApiRelease, ApiVersions, Connection, ConnectionSummary, DeviceEndpoint, Scheme,
    SessionHandle, DEFAULT_PORT,
};
pub use connector::{ConnectOptions, Connector, ConnectorBuilder};
pub use credential::{
    Credential, CredentialPrompt, CredentialResolver, CredentialSource, NoPrompt, Secret,
    TerminalPrompt,
};
pub use dispatcher::{RequestDispatcher, RestDispatcher, API_ROOT};
pub use error::{BoxError, RequestFailure, Result, SessionError};
pub use negotiator::{
    SessionNegotiator, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, LOGIN_PATH, PROBE_PATH,
};
pub use registry::ConnectionRegistry;
pub use terminator::{
    Ack, Confirm, DenyAll, SessionTerminator, TerminalConfirm, DISCONNECT_PROMPT, LOGOUT_PATH,
};
pub use transport::{
    RuntimeCapability, SecurityPosture, TlsFloor, TransportOptions, TransportPolicy,
};

// Re-export the HTTP method type used by the dispatcher
pub use reqwest::Method;
