//! Info command - show the negotiated connection

use anyhow::Result;
use switch_session::Connection;

use crate::output::{ConnectionRow, OutputContext};

/// Show server, port and API version of the session
pub fn info(connection: &Connection, ctx: &OutputContext) -> Result<()> {
    ctx.print_one(&ConnectionRow::from(connection.summary()));
    Ok(())
}
