//! TACACS+ authentication, authorization and accounting for proxied calls.

use std::time::Duration;

use tacacs_plus::AuthenticationType;

mod controller;
pub use controller::{AaaController, NO_ERROR};

mod error;
pub use error::AaaError;

mod resolver;
pub use resolver::{Resolver, DEFAULT_PORT};

/// Settings for talking to the TACACS+ server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AaaConfig {
    /// `host[:port]` of the TACACS+ server; `None` disables AAA entirely.
    pub server_address: Option<String>,

    /// Pre-shared key for body obfuscation; `None` sends packets unobfuscated.
    pub secret: Option<String>,

    /// Whether an unreachable or ambiguous server lets calls through.
    pub fallback_pass: bool,

    /// Bound on establishing each TACACS+ connection.
    pub connect_timeout: Duration,

    /// Time each exchange may take on top of `connect_timeout` before the server counts as
    /// unreachable.
    pub reply_timeout: Duration,

    /// How logins are performed, PAP or ASCII.
    pub authentication_type: AuthenticationType,
}

impl Default for AaaConfig {
    fn default() -> Self {
        Self {
            server_address: None,
            secret: None,
            fallback_pass: true,
            connect_timeout: Duration::from_secs(60),
            reply_timeout: Duration::from_secs(30),
            authentication_type: AuthenticationType::Pap,
        }
    }
}
