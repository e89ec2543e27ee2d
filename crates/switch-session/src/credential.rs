//! Credential resolution
//!
//! A credential comes from, in priority order:
//! 1. an explicit username and secret pair,
//! 2. an explicit [`Credential`] object,
//! 3. an interactive [`CredentialPrompt`].

use std::fmt;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// A secret string whose `Debug` output is redacted
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the plain value (only for putting it on the wire)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Username and secret pair presented at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub secret: Secret,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<Secret>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

/// Caller-supplied credential inputs, all optional
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    pub username: Option<String>,
    pub secret: Option<Secret>,
    pub credential: Option<Credential>,
}

impl CredentialSource {
    /// Explicit username and secret
    pub fn pair(username: impl Into<String>, secret: impl Into<Secret>) -> Self {
        Self {
            username: Some(username.into()),
            secret: Some(secret.into()),
            credential: None,
        }
    }

    /// Explicit credential object
    pub fn credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            ..Self::default()
        }
    }
}

/// Interactive source of credentials
pub trait CredentialPrompt: Send + Sync {
    /// Ask for a credential labeled for `target`.
    ///
    /// `username_hint` is the username the caller supplied without a secret.
    /// Returns `None` when no input is available.
    fn prompt(&self, target: &str, username_hint: Option<&str>) -> Option<Credential>;
}

impl<F> CredentialPrompt for F
where
    F: Fn(&str, Option<&str>) -> Option<Credential> + Send + Sync,
{
    fn prompt(&self, target: &str, username_hint: Option<&str>) -> Option<Credential> {
        self(target, username_hint)
    }
}

/// Prompt that never yields a credential (non-interactive use)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl CredentialPrompt for NoPrompt {
    fn prompt(&self, _target: &str, _username_hint: Option<&str>) -> Option<Credential> {
        None
    }
}

/// Prompt on the controlling terminal (stderr for labels, stdin for input)
///
/// Yields nothing when stdin is not a terminal. The secret is read without echo.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn prompt(&self, target: &str, username_hint: Option<&str>) -> Option<Credential> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return None;
        }
        let mut stderr = std::io::stderr();

        writeln!(stderr, "Please enter the credential for {}", target).ok()?;
        let username = match username_hint {
            Some(name) => name.to_string(),
            None => {
                write!(stderr, "User: ").ok()?;
                stderr.flush().ok()?;
                stdin.lock().lines().next()?.ok()?.trim().to_string()
            }
        };
        write!(stderr, "Password for {}: ", username).ok()?;
        stderr.flush().ok()?;
        let secret = match rpassword::read_password() {
            Ok(secret) => secret,
            Err(e) => {
                warn!(error = %e, "Failed to read password");
                return None;
            }
        };

        if username.is_empty() {
            return None;
        }
        Some(Credential::new(username, secret))
    }
}

/// Resolves a [`Credential`] once per connection attempt
#[derive(Clone)]
pub struct CredentialResolver {
    prompt: Arc<dyn CredentialPrompt>,
}

impl CredentialResolver {
    pub fn new(prompt: Arc<dyn CredentialPrompt>) -> Self {
        Self { prompt }
    }

    /// Resolve without any interactive fallback
    pub fn non_interactive() -> Self {
        Self::new(Arc::new(NoPrompt))
    }

    /// Resolve a credential for `target`
    pub async fn resolve(&self, source: CredentialSource, target: &str) -> Result<Credential> {
        match source {
            CredentialSource {
                username: Some(username),
                secret: Some(secret),
                ..
            } => {
                debug!(%username, "Using explicit username and secret");
                Ok(Credential { username, secret })
            }
            CredentialSource {
                credential: Some(credential),
                ..
            } => {
                debug!(username = %credential.username, "Using explicit credential");
                Ok(credential)
            }
            CredentialSource { username, .. } => {
                debug!(target, "Prompting for credential");
                let prompt = self.prompt.clone();
                let target = target.to_string();
                let prompted = tokio::task::spawn_blocking(move || {
                    prompt.prompt(&target, username.as_deref())
                })
                .await;
                match prompted {
                    Ok(credential) => credential.ok_or(SessionError::NoCredential),
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => {
                        warn!(error = %e, "Credential prompt did not complete");
                        Err(SessionError::NoCredential)
                    }
                }
            }
        }
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(Arc::new(TerminalPrompt))
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompted() -> CredentialResolver {
        CredentialResolver::new(Arc::new(|_: &str, hint: Option<&str>| {
            Some(Credential::new(hint.unwrap_or("prompted"), "from-prompt"))
        }))
    }

    #[tokio::test]
    async fn test_pair_wins_over_credential_object() {
        let source = CredentialSource {
            username: Some("pair".into()),
            secret: Some("pair-secret".into()),
            credential: Some(Credential::new("object", "object-secret")),
        };
        let cred = prompted().resolve(source, "sw1").await.unwrap();
        assert_eq!(cred, Credential::new("pair", "pair-secret"));
    }

    #[tokio::test]
    async fn test_credential_object_wins_over_prompt() {
        let source = CredentialSource::credential(Credential::new("object", "object-secret"));
        let cred = prompted().resolve(source, "sw1").await.unwrap();
        assert_eq!(cred.username, "object");
    }

    #[tokio::test]
    async fn test_username_without_secret_falls_through() {
        let source = CredentialSource {
            username: Some("admin".into()),
            ..Default::default()
        };
        let cred = prompted().resolve(source, "sw1").await.unwrap();
        assert_eq!(cred, Credential::new("admin", "from-prompt"));
    }

    #[tokio::test]
    async fn test_prompt_is_last_resort() {
        let cred = prompted()
            .resolve(CredentialSource::default(), "sw1")
            .await
            .unwrap();
        assert_eq!(cred, Credential::new("prompted", "from-prompt"));
    }

    #[tokio::test]
    async fn test_prompt_receives_target_label() {
        let resolver = CredentialResolver::new(Arc::new(|target: &str, _: Option<&str>| {
            Some(Credential::new(target, "x"))
        }));
        let cred = resolver
            .resolve(CredentialSource::default(), "switch.example.com")
            .await
            .unwrap();
        assert_eq!(cred.username, "switch.example.com");
    }

    #[tokio::test]
    async fn test_no_prompt_yields_no_credential() {
        let err = CredentialResolver::non_interactive()
            .resolve(CredentialSource::default(), "sw1")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoCredential));
    }

    #[tokio::test]
    #[should_panic(expected = "prompt exploded")]
    async fn test_panicking_prompt_propagates() {
        let resolver = CredentialResolver::new(Arc::new(
            |_: &str, _: Option<&str>| -> Option<Credential> { panic!("prompt exploded") },
        ));
        let _ = resolver.resolve(CredentialSource::default(), "sw1").await;
    }

    #[test]
    fn test_terminal_prompt_without_tty_yields_nothing() {
        if std::io::stdin().is_terminal() {
            return;
        }
        assert!(TerminalPrompt.prompt("sw1", Some("admin")).is_none());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let cred = Credential::new("admin", "hunter2");
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("admin"));
    }
}
