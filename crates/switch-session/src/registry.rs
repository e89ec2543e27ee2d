//! Default connection registry

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Result, SessionError};

/// Holds at most one default [`Connection`]
///
/// Callers that never register a connection can ignore this entirely and pass
/// their `Arc<Connection>` around explicitly.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    current: RwLock<Option<Arc<Connection>>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<ConnectionRegistry>> = OnceLock::new();

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> Arc<ConnectionRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(ConnectionRegistry::new()))
            .clone()
    }

    /// Make `connection` the default, replacing any previous one
    pub fn set_default(&self, connection: Arc<Connection>) {
        debug!(endpoint = %connection.endpoint(), "Registering default connection");
        *self.current.write() = Some(connection);
    }

    /// The current default connection
    pub fn get_default(&self) -> Result<Arc<Connection>> {
        self.current
            .read()
            .clone()
            .ok_or(SessionError::NoDefaultConnection)
    }

    /// Remove the default, if any
    pub fn clear_default(&self) {
        if self.current.write().take().is_some() {
            debug!("Cleared default connection");
        }
    }

    /// Remove the default only if it is `connection`. Returns whether it was cleared.
    pub fn clear_if(&self, connection: &Connection) -> bool {
        let mut current = self.current.write();
        let matches = current.as_deref().is_some_and(|registered| {
            std::ptr::eq(registered, connection) || registered == connection
        });
        if matches {
            *current = None;
            debug!(endpoint = %connection.endpoint(), "Cleared default connection");
        }
        matches
    }

    pub fn has_default(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_connection as connection;

    #[test]
    fn test_set_then_get_returns_same_connection() {
        let registry = ConnectionRegistry::new();
        let conn = connection("sw1", "id=1");
        registry.set_default(conn.clone());

        let got = registry.get_default().unwrap();
        assert!(Arc::ptr_eq(&got, &conn));
        assert_eq!(*got, *conn);
    }

    #[test]
    fn test_empty_registry_has_no_default() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.has_default());
        assert!(matches!(
            registry.get_default(),
            Err(SessionError::NoDefaultConnection)
        ));
    }

    #[test]
    fn test_clear_then_get_fails() {
        let registry = ConnectionRegistry::new();
        registry.set_default(connection("sw1", "id=1"));
        registry.clear_default();
        assert!(matches!(
            registry.get_default(),
            Err(SessionError::NoDefaultConnection)
        ));
        // Clearing an empty registry is a no-op
        registry.clear_default();
        assert!(!registry.has_default());
    }

    #[test]
    fn test_set_replaces_previous_default() {
        let registry = ConnectionRegistry::new();
        let first = connection("sw1", "id=1");
        let second = connection("sw2", "id=2");
        registry.set_default(first);
        registry.set_default(second.clone());

        let got = registry.get_default().unwrap();
        assert_eq!(got.server(), "sw2");
        assert!(Arc::ptr_eq(&got, &second));
    }

    #[test]
    fn test_clear_if_only_matches_registered_connection() {
        let registry = ConnectionRegistry::new();
        let registered = connection("sw1", "id=1");
        let other = connection("sw2", "id=2");
        registry.set_default(registered.clone());

        assert!(!registry.clear_if(&other));
        assert!(registry.has_default());

        assert!(registry.clear_if(&registered));
        assert!(!registry.has_default());
    }
}
