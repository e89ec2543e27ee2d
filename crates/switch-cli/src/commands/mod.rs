//! Command implementations for switch-cli

pub mod info;
pub mod invoke;

pub use info::info;
pub use invoke::invoke;

use anyhow::Result;
use switch_session::{Connection, Connector, SessionError};

use crate::output::OutputContext;

/// Log out after a command, unless the user declines
pub async fn disconnect(
    connector: &Connector,
    connection: &Connection,
    no_confirm: bool,
    ctx: &OutputContext,
) -> Result<()> {
    match connector.disconnect(connection, no_confirm).await {
        Ok(_) => {
            ctx.success(&format!("Disconnected from {}", connection.endpoint()));
            Ok(())
        }
        Err(SessionError::UserAborted) => {
            ctx.warn("Logout skipped; the device session stays open until it expires");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
