//! Command line & environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use tacacs_plus::AuthenticationType;

use crate::AaaConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// How logins are presented to the TACACS+ server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LoginMode {
    /// Password sent in the authentication start packet.
    #[default]
    Pap,
    /// Username & password sent when the server prompts for them.
    Ascii,
}

impl From<LoginMode> for AuthenticationType {
    fn from(mode: LoginMode) -> Self {
        match mode {
            LoginMode::Pap => AuthenticationType::Pap,
            LoginMode::Ascii => AuthenticationType::Ascii,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "tacacs-auth-proxy",
    version,
    about = "TACACS+ authenticating proxy for the OpenOLT agent"
)]
pub struct Args {
    /// Address to serve the proxied OpenOLT gRPC service on.
    #[arg(long, env = "TACACS_PROXY_LISTEN")]
    pub listen: SocketAddr,

    /// OpenOLT agent to forward authorized calls to (host:port or URI).
    #[arg(long, env = "TACACS_PROXY_BACKEND")]
    pub backend: String,

    /// TACACS+ server as host[:port]; AAA is disabled when unset.
    #[arg(long, env = "TACACS_SERVER")]
    pub tacacs_server: Option<String>,

    /// Shared secret for TACACS+ body obfuscation; packets are sent unobfuscated when unset.
    #[arg(long, env = "TACACS_SECRET", hide_env_values = true)]
    pub tacacs_secret: Option<String>,

    /// Let calls through when the TACACS+ server is unreachable or gives no clear answer.
    #[arg(
        long,
        env = "TACACS_FALLBACK_PASS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub tacacs_fallback_pass: bool,

    /// Seconds to wait for a TACACS+ connection to be established.
    #[arg(long, default_value_t = 60)]
    pub tacacs_connect_timeout_secs: u64,

    /// Seconds a TACACS+ exchange may take once connected before the server counts as unreachable.
    #[arg(long, default_value_t = 30)]
    pub tacacs_reply_timeout_secs: u64,

    /// TACACS+ login type.
    #[arg(long, value_enum, default_value_t = LoginMode::Pap)]
    pub tacacs_authen_type: LoginMode,

    /// Log output format: text or json.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// The backend address as a URI, assuming plain HTTP/2 when no scheme is given.
    pub fn backend_uri(&self) -> String {
        if self.backend.contains("://") {
            self.backend.clone()
        } else {
            format!("http://{}", self.backend)
        }
    }

    pub fn aaa_config(&self) -> AaaConfig {
        let non_empty = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());

        AaaConfig {
            server_address: non_empty(&self.tacacs_server),
            secret: non_empty(&self.tacacs_secret),
            fallback_pass: self.tacacs_fallback_pass,
            connect_timeout: Duration::from_secs(self.tacacs_connect_timeout_secs),
            reply_timeout: Duration::from_secs(self.tacacs_reply_timeout_secs),
            authentication_type: self.tacacs_authen_type.into(),
        }
    }
}
