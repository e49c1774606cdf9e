use std::io;
use std::net::SocketAddr;
use std::sync::OnceLock;

use tokio::net::lookup_host;
use tracing::debug;

/// The registered TACACS+ port, used when the configured address doesn't name one.
pub const DEFAULT_PORT: u16 = 49;

/// Resolves the TACACS+ server address once and caches it for the lifetime of the process.
///
/// Failed resolutions aren't cached, so every call retries until one succeeds.
#[derive(Debug)]
pub struct Resolver {
    address: String,
    resolved: OnceLock<SocketAddr>,
}

impl Resolver {
    pub fn new<A: Into<String>>(address: A) -> Self {
        Self {
            address: address.into(),
            resolved: OnceLock::new(),
        }
    }

    /// The configured `host[:port]` address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The cached address, if resolution has succeeded before.
    pub fn cached(&self) -> Option<SocketAddr> {
        self.resolved.get().copied()
    }

    pub async fn resolve(&self) -> io::Result<SocketAddr> {
        if let Some(address) = self.cached() {
            return Ok(address);
        }

        let (host, port) = split_host_port(&self.address)?;
        let address = lookup_host((host, port)).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", self.address),
            )
        })?;

        debug!(server = %self.address, %address, "resolved TACACS+ server");

        // a concurrent call may have published first; both results are equivalent
        let _ = self.resolved.set(address);

        Ok(address)
    }
}

fn invalid_address(address: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid TACACS+ server address {address:?}"),
    )
}

/// Splits `host[:port]` into its parts, defaulting to [`DEFAULT_PORT`].
///
/// IPv6 hosts need brackets to be given a port (`[::1]:4949`); bare IPv6 addresses use the default port.
fn split_host_port(address: &str) -> io::Result<(&str, u16)> {
    let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid_address(address));

    if let Some(bracketed) = address.strip_prefix('[') {
        let (host, rest) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid_address(address))?;

        return match rest.strip_prefix(':') {
            Some(port) => Ok((host, parse_port(port)?)),
            None if rest.is_empty() => Ok((host, DEFAULT_PORT)),
            None => Err(invalid_address(address)),
        };
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Ok((host, parse_port(port)?)),
        _ if address.is_empty() => Err(invalid_address(address)),
        _ => Ok((address, DEFAULT_PORT)),
    }
}
