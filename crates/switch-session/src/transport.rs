//! Transport policy: TLS verification and HTTP client feature flags
//!
//! Two runtime capabilities are supported. A [`RuntimeCapability::Modern`] stack
//! scopes every override to the client it builds. A
//! [`RuntimeCapability::Legacy`] stack needs process-wide adjustments, which are
//! held in a [`SecurityPosture`]:
//!
//! - TLS 1.1 and TLS 1.2 are enabled once for the whole process.
//! - When a certificate check is skipped, certificate-chain trust is relaxed for
//!   the whole process. Every legacy client built afterwards accepts any server
//!   certificate, including clients for connections that did not ask for it.
//!
//! Both adjustments are one-way and idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::ClientBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// HTTP stack capability the policy is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeCapability {
    /// Old TLS defaults, no per-request certificate override
    Legacy,
    /// Per-client TLS overrides available
    #[default]
    Modern,
}

/// Lowest TLS protocol version a client may negotiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsFloor {
    Tls11,
}

/// Process-wide TLS adjustments required by legacy stacks
#[derive(Debug, Default)]
pub struct SecurityPosture {
    legacy_protocols: AtomicBool,
    chain_trust_relaxed: AtomicBool,
}

static GLOBAL_POSTURE: OnceLock<Arc<SecurityPosture>> = OnceLock::new();

impl SecurityPosture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The posture shared by the whole process
    pub fn global() -> Arc<SecurityPosture> {
        GLOBAL_POSTURE
            .get_or_init(|| Arc::new(SecurityPosture::new()))
            .clone()
    }

    /// Enable TLS 1.1 and TLS 1.2. Returns `true` only on the first call.
    pub fn enable_legacy_protocols(&self) -> bool {
        let changed = self
            .legacy_protocols
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            info!("Enabled TLS 1.1 and TLS 1.2 for legacy transport");
        }
        changed
    }

    /// Accept any certificate chain for every legacy client from now on.
    /// Returns `true` only on the first call.
    pub fn relax_chain_trust(&self) -> bool {
        let changed = self
            .chain_trust_relaxed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            warn!("Certificate chain trust relaxed process-wide for legacy transport");
        }
        changed
    }

    pub fn legacy_protocols_enabled(&self) -> bool {
        self.legacy_protocols.load(Ordering::Acquire)
    }

    pub fn chain_trust_relaxed(&self) -> bool {
        self.chain_trust_relaxed.load(Ordering::Acquire)
    }
}

/// Resolved HTTP/TLS behavior for one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Capability the options were resolved for
    pub runtime: RuntimeCapability,
    /// Accept any server certificate
    pub accept_invalid_certs: bool,
    /// Reuse connections between requests
    pub keep_alive: bool,
    /// Legacy parsing hint (plain HTTP/1.1 framing)
    pub basic_parsing: bool,
    /// Minimum TLS version, if the default must be lowered
    pub min_tls: Option<TlsFloor>,
}

impl TransportOptions {
    /// Apply the options and timeouts to a reqwest client builder
    pub fn apply(
        &self,
        builder: ClientBuilder,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> ClientBuilder {
        let mut builder = builder
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if !self.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }
        if self.basic_parsing {
            builder = builder.http1_only();
        }
        if let Some(TlsFloor::Tls11) = self.min_tls {
            builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_1);
        }
        builder
    }
}

/// Resolves [`TransportOptions`] and applies legacy process-wide adjustments
#[derive(Debug, Clone)]
pub struct TransportPolicy {
    posture: Arc<SecurityPosture>,
}

impl TransportPolicy {
    /// Policy backed by the given posture
    pub fn new(posture: Arc<SecurityPosture>) -> Self {
        Self { posture }
    }

    pub fn posture(&self) -> &Arc<SecurityPosture> {
        &self.posture
    }

    /// Resolve options for a connection attempt.
    ///
    /// On the legacy path this enables the legacy TLS protocols and, when
    /// `skip_certificate_check` is set, relaxes chain trust process-wide. Call it
    /// before any network I/O for the attempt.
    pub fn resolve(
        &self,
        skip_certificate_check: bool,
        runtime: RuntimeCapability,
    ) -> TransportOptions {
        match runtime {
            RuntimeCapability::Modern => TransportOptions {
                runtime,
                accept_invalid_certs: skip_certificate_check,
                keep_alive: true,
                basic_parsing: false,
                min_tls: None,
            },
            RuntimeCapability::Legacy => {
                self.posture.enable_legacy_protocols();
                if skip_certificate_check {
                    self.posture.relax_chain_trust();
                }
                TransportOptions {
                    runtime,
                    accept_invalid_certs: skip_certificate_check
                        || self.posture.chain_trust_relaxed(),
                    keep_alive: true,
                    basic_parsing: true,
                    min_tls: Some(TlsFloor::Tls11),
                }
            }
        }
    }
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self::new(SecurityPosture::global())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isolated() -> TransportPolicy {
        TransportPolicy::new(Arc::new(SecurityPosture::new()))
    }

    #[test]
    fn test_modern_defaults() {
        let policy = isolated();
        let opts = policy.resolve(false, RuntimeCapability::Modern);
        assert!(!opts.accept_invalid_certs);
        assert!(opts.keep_alive);
        assert!(!opts.basic_parsing);
        assert_eq!(opts.min_tls, None);
        assert!(!policy.posture().legacy_protocols_enabled());
    }

    #[test]
    fn test_modern_skip_is_scoped() {
        let policy = isolated();
        let opts = policy.resolve(true, RuntimeCapability::Modern);
        assert!(opts.accept_invalid_certs);
        assert!(!policy.posture().chain_trust_relaxed());
    }

    #[test]
    fn test_legacy_enables_protocols_once() {
        let policy = isolated();
        let opts = policy.resolve(false, RuntimeCapability::Legacy);
        assert!(opts.basic_parsing);
        assert!(opts.keep_alive);
        assert_eq!(opts.min_tls, Some(TlsFloor::Tls11));
        assert!(policy.posture().legacy_protocols_enabled());
        assert!(!policy.posture().enable_legacy_protocols());
        assert!(!policy.posture().chain_trust_relaxed());
    }

    #[test]
    fn test_legacy_skip_relaxes_chain_trust_once() {
        let posture = Arc::new(SecurityPosture::new());
        let policy = TransportPolicy::new(posture.clone());

        policy.resolve(true, RuntimeCapability::Legacy);
        assert!(posture.chain_trust_relaxed());
        policy.resolve(true, RuntimeCapability::Legacy);
        assert!(posture.chain_trust_relaxed());

        // Already relaxed: a further request is not a new transition
        assert!(!posture.relax_chain_trust());
    }

    #[test]
    fn test_relaxed_posture_leaks_into_later_legacy_clients() {
        let policy = isolated();
        policy.resolve(true, RuntimeCapability::Legacy);
        let later = policy.resolve(false, RuntimeCapability::Legacy);
        assert!(later.accept_invalid_certs);

        let modern = policy.resolve(false, RuntimeCapability::Modern);
        assert!(!modern.accept_invalid_certs);
    }

    #[test]
    fn test_options_build_client() {
        let policy = isolated();
        for runtime in [RuntimeCapability::Modern, RuntimeCapability::Legacy] {
            let opts = policy.resolve(true, runtime);
            let builder = opts.apply(
                reqwest::Client::builder(),
                Duration::from_secs(5),
                Duration::from_secs(2),
            );
            assert!(builder.build().is_ok());
        }
    }
}
