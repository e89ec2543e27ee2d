//! Session teardown

use std::io::{BufRead, IsTerminal, Write};

use reqwest::Method;
use tracing::{info, instrument, warn};

use crate::connection::Connection;
use crate::dispatcher::RequestDispatcher;
use crate::error::{Result, SessionError};
use crate::registry::ConnectionRegistry;

/// Logout endpoint, relative to the versioned API root
pub const LOGOUT_PATH: &str = "logout";

/// Question asked before logging out
pub const DISCONNECT_PROMPT: &str = "Proceed with removal of connection?";

/// Yes/no confirmation capability
pub trait Confirm: Send + Sync {
    /// `true` to proceed. Implementations answer `false` when unsure.
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Always declines
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Confirm for DenyAll {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

/// Asks on the terminal; anything but `y`/`yes` (or no terminal) declines
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return false;
        }
        let mut stderr = std::io::stderr();
        if write!(stderr, "{} [y/N] ", message)
            .and_then(|_| stderr.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Acknowledgment of a completed logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Whether the registry default pointed at this connection and was cleared
    pub cleared_default: bool,
}

/// Logs out a [`Connection`] and keeps the registry consistent
pub struct SessionTerminator<'a> {
    dispatcher: &'a dyn RequestDispatcher,
    registry: &'a ConnectionRegistry,
    confirm: &'a dyn Confirm,
}

impl<'a> SessionTerminator<'a> {
    pub fn new(
        dispatcher: &'a dyn RequestDispatcher,
        registry: &'a ConnectionRegistry,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            dispatcher,
            registry,
            confirm,
        }
    }

    /// Log out `connection`.
    ///
    /// Without `force_no_confirm` the user is asked first; declining returns
    /// [`SessionError::UserAborted`] without any request. The registry default is
    /// cleared only after the device acknowledged the logout.
    #[instrument(skip(self, connection), fields(endpoint = %connection.endpoint()))]
    pub async fn disconnect(
        &self,
        connection: &Connection,
        force_no_confirm: bool,
    ) -> Result<Ack> {
        if !force_no_confirm && !self.confirm.confirm(DISCONNECT_PROMPT) {
            info!("Disconnect declined");
            return Err(SessionError::UserAborted);
        }

        if let Err(e) = self
            .dispatcher
            .invoke(Method::POST, LOGOUT_PATH, connection, None)
            .await
        {
            warn!(error = %e, "Logout failed");
            return Err(SessionError::LogoutFailure(e));
        }

        let cleared_default = self.registry.clear_if(connection);
        info!(cleared_default, "Logged out");
        Ok(Ack { cleared_default })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::connection::test_connection;
    use crate::error::RequestFailure;

    /// Dispatcher that records calls and fails every request
    #[derive(Default)]
    struct RecordingDispatcher {
        calls: AtomicUsize,
        paths: parking_lot::Mutex<Vec<(Method, String)>>,
    }

    #[async_trait]
    impl RequestDispatcher for RecordingDispatcher {
        async fn invoke(
            &self,
            method: Method,
            path: &str,
            _connection: &Connection,
            _body: Option<&serde_json::Value>,
        ) -> std::result::Result<reqwest::Response, RequestFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.paths.lock().push((method, path.to_string()));
            Err(RequestFailure::server_error(503, "unavailable"))
        }
    }

    #[tokio::test]
    async fn test_declined_confirmation_makes_no_call() {
        let dispatcher = RecordingDispatcher::default();
        let registry = ConnectionRegistry::new();
        let conn = test_connection("sw1", "id=1");
        registry.set_default(conn.clone());

        let terminator = SessionTerminator::new(&dispatcher, &registry, &DenyAll);
        let err = terminator.disconnect(&conn, false).await.unwrap_err();

        assert!(matches!(err, SessionError::UserAborted));
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
        assert!(registry.has_default());
    }

    #[tokio::test]
    async fn test_forced_disconnect_posts_logout() {
        let dispatcher = RecordingDispatcher::default();
        let registry = ConnectionRegistry::new();
        let conn = test_connection("sw1", "id=1");

        let terminator = SessionTerminator::new(&dispatcher, &registry, &DenyAll);
        let _ = terminator.disconnect(&conn, true).await;

        let paths = dispatcher.paths.lock().clone();
        assert_eq!(paths, vec![(Method::POST, LOGOUT_PATH.to_string())]);
    }

    #[tokio::test]
    async fn test_logout_failure_leaves_registry() {
        let dispatcher = RecordingDispatcher::default();
        let registry = ConnectionRegistry::new();
        let conn = test_connection("sw1", "id=1");
        registry.set_default(conn.clone());

        let terminator = SessionTerminator::new(&dispatcher, &registry, &DenyAll);
        let err = terminator.disconnect(&conn, true).await.unwrap_err();

        match err {
            SessionError::LogoutFailure(cause) => assert_eq!(cause.status(), Some(503)),
            other => panic!("expected LogoutFailure, got {:?}", other),
        }
        assert!(registry.has_default());
    }

    #[test]
    fn test_closure_confirm() {
        let yes = |msg: &str| msg == DISCONNECT_PROMPT;
        assert!(yes.confirm(DISCONNECT_PROMPT));
        assert!(!DenyAll.confirm(DISCONNECT_PROMPT));
    }
}
