//! Extraction of Basic-Auth style credentials from inbound call metadata.

use std::net::SocketAddr;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tonic::metadata::MetadataMap;

use crate::{CallContext, Password};

/// Metadata key carrying the credentials.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Length of the `Basic ` scheme marker preceding the encoded credentials.
const SCHEME_LENGTH: usize = 6;

/// Reported as the remote address when the transport doesn't know the peer.
pub const UNKNOWN_PEER_ADDRESS: &str = "0.0.0.0";

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Builds the context for a call from its metadata and peer address.
///
/// A missing or undecodable `authorization` value yields a context without credentials
/// (an empty username), which callers must reject.
pub fn extract(metadata: &MetadataMap, peer: Option<SocketAddr>) -> CallContext {
    let remote_address = peer.map_or_else(
        || UNKNOWN_PEER_ADDRESS.to_owned(),
        |address| address.ip().to_string(),
    );

    let encoded = metadata
        .get(AUTHORIZATION_KEY)
        .and_then(|value| value.to_str().ok())
        // the scheme name itself isn't checked
        .map(|value| value.get(SCHEME_LENGTH..).unwrap_or_default());

    let (username, password) = match encoded {
        Some(encoded) => split_credentials(&decode_lenient(encoded)),
        None => (String::new(), Password::default()),
    };

    CallContext::new(username, password, remote_address)
}

/// Decodes standard base64, stopping at the first padding or non-alphabet character.
pub fn decode_lenient(encoded: &str) -> Vec<u8> {
    let end = encoded
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '+' || c == '/'))
        .unwrap_or(encoded.len());
    let mut valid = &encoded[..end];

    // a lone trailing character doesn't carry a full byte
    if valid.len() % 4 == 1 {
        valid = &valid[..valid.len() - 1];
    }

    LENIENT_BASE64.decode(valid).unwrap_or_default()
}

/// Splits decoded credentials on the first `:` into a username and password.
///
/// Credentials without a `:` are treated as missing altogether.
fn split_credentials(decoded: &[u8]) -> (String, Password) {
    let decoded = String::from_utf8_lossy(decoded);

    match decoded.split_once(':') {
        Some((username, password)) => (username.to_owned(), Password::new(password)),
        None => (String::new(), Password::default()),
    }
}
