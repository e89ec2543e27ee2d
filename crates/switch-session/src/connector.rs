//! Connect/disconnect entry points tying the lifecycle components together

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::connection::{Connection, DeviceEndpoint, Scheme, DEFAULT_PORT};
use crate::credential::{CredentialPrompt, CredentialResolver, CredentialSource};
use crate::dispatcher::{RequestDispatcher, RestDispatcher};
use crate::error::Result;
use crate::negotiator::{SessionNegotiator, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::registry::ConnectionRegistry;
use crate::terminator::{Ack, Confirm, SessionTerminator, TerminalConfirm};
use crate::transport::{RuntimeCapability, SecurityPosture, TransportPolicy};

/// Parameters of one connection attempt
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub server: String,
    pub port: u16,
    pub scheme: Scheme,
    pub credentials: CredentialSource,
    pub skip_certificate_check: bool,
    pub runtime: RuntimeCapability,
    /// Register the new connection as the registry default
    pub register_default: bool,
}

impl ConnectOptions {
    /// Defaults: port 443, HTTPS, certificate checks on, registered as default
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: DEFAULT_PORT,
            scheme: Scheme::Https,
            credentials: CredentialSource::default(),
            skip_certificate_check: false,
            runtime: RuntimeCapability::Modern,
            register_default: true,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn skip_certificate_check(mut self, skip: bool) -> Self {
        self.skip_certificate_check = skip;
        self
    }

    pub fn runtime(mut self, runtime: RuntimeCapability) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn register_default(mut self, register: bool) -> Self {
        self.register_default = register;
        self
    }
}

/// Session manager for switch REST APIs
///
/// Every collaborator is injectable; [`Connector::new`] wires the process-wide
/// registry and posture with terminal prompts.
pub struct Connector {
    resolver: CredentialResolver,
    policy: TransportPolicy,
    negotiator: SessionNegotiator,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<dyn RequestDispatcher>,
    confirm: Arc<dyn Confirm>,
}

impl Connector {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::default()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<dyn RequestDispatcher> {
        &self.dispatcher
    }

    /// Resolve credentials, negotiate a session and optionally register it
    #[instrument(skip(self, options), fields(server = %options.server, port = options.port))]
    pub async fn connect(&self, options: ConnectOptions) -> Result<Arc<Connection>> {
        let endpoint = DeviceEndpoint::with_scheme(options.server, options.port, options.scheme)?;
        let credential = self
            .resolver
            .resolve(options.credentials, endpoint.server())
            .await?;
        let transport = self
            .policy
            .resolve(options.skip_certificate_check, options.runtime);

        let connection = Arc::new(
            self.negotiator
                .negotiate(&endpoint, &credential, &transport)
                .await?,
        );

        if options.register_default {
            self.registry.set_default(connection.clone());
        }
        info!(
            api_version = connection.api_version(),
            registered = options.register_default,
            "Connected"
        );
        Ok(connection)
    }

    /// Log out `connection`, clearing the default if it pointed at it
    pub async fn disconnect(
        &self,
        connection: &Connection,
        force_no_confirm: bool,
    ) -> Result<Ack> {
        SessionTerminator::new(
            self.dispatcher.as_ref(),
            &self.registry,
            self.confirm.as_ref(),
        )
        .disconnect(connection, force_no_confirm)
        .await
    }

    /// Log out the registry default
    pub async fn disconnect_default(&self, force_no_confirm: bool) -> Result<Ack> {
        let connection = self.registry.get_default()?;
        self.disconnect(&connection, force_no_confirm).await
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Connector`]
pub struct ConnectorBuilder {
    prompt: Option<Arc<dyn CredentialPrompt>>,
    posture: Option<Arc<SecurityPosture>>,
    registry: Option<Arc<ConnectionRegistry>>,
    dispatcher: Option<Arc<dyn RequestDispatcher>>,
    confirm: Option<Arc<dyn Confirm>>,
    timeout: Duration,
    connect_timeout: Duration,
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self {
            prompt: None,
            posture: None,
            registry: None,
            dispatcher: None,
            confirm: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectorBuilder {
    pub fn prompt(mut self, prompt: Arc<dyn CredentialPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn posture(mut self, posture: Arc<SecurityPosture>) -> Self {
        self.posture = Some(posture);
        self
    }

    pub fn registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn RequestDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn build(self) -> Connector {
        Connector {
            resolver: self
                .prompt
                .map(CredentialResolver::new)
                .unwrap_or_default(),
            policy: TransportPolicy::new(self.posture.unwrap_or_else(SecurityPosture::global)),
            negotiator: SessionNegotiator::with_config(self.timeout, self.connect_timeout),
            registry: self.registry.unwrap_or_else(ConnectionRegistry::global),
            dispatcher: self
                .dispatcher
                .unwrap_or_else(|| Arc::new(RestDispatcher::new())),
            confirm: self.confirm.unwrap_or_else(|| Arc::new(TerminalConfirm)),
        }
    }
}
