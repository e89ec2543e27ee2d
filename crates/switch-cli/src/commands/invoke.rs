//! Invoke command - send one authenticated request

use anyhow::{bail, Context, Result};
use switch_session::{Connection, Method, RequestDispatcher, RestDispatcher};

use crate::output::OutputContext;

/// Send `method` to `path` with the session and print the response
pub async fn invoke(
    connection: &Connection,
    method: &str,
    path: &str,
    body: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let method = parse_method(method)?;
    let body = body
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("Request body is not valid JSON")?;

    let response = RestDispatcher::new()
        .invoke(method, path, connection, body.as_ref())
        .await
        .with_context(|| format!("Request to {} failed", path))?;
    let text = response
        .text()
        .await
        .context("Failed to read response body")?;

    if text.trim().is_empty() {
        ctx.success("OK");
    } else {
        let value: serde_json::Value =
            serde_json::from_str(&text).context("Response is not valid JSON")?;
        ctx.print_value(&value);
    }
    Ok(())
}

fn parse_method(method: &str) -> Result<Method> {
    match method.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => bail!(
            "Unknown method: {}. Valid methods: GET, POST, PUT, PATCH, DELETE",
            method
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Delete").unwrap(), Method::DELETE);
        assert!(parse_method("TRACE").is_err());
    }
}
