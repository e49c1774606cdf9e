use crate::Argument;

/// The final outcome of an authentication or authorization exchange.
///
/// Statuses outside of these two are reported as errors, since the server did not give a clear answer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResponseStatus {
    /// The operation succeeded.
    Success,

    /// The operation was explicitly rejected by the server.
    Failure,
}

/// A server response from an authentication session.
#[must_use = "At the very least, the authentication status must be checked, as an authentication failure is not reported as an error."]
#[derive(PartialEq, Eq, Debug)]
pub struct AuthenticationResponse {
    /// Whether the authentication attempt passed or failed.
    pub status: ResponseStatus,

    /// The message returned by the server, intended to be displayed to the user.
    pub message: String,

    /// Extra data returned by the server.
    pub data: Vec<u8>,
}

/// The response from a successful TACACS+ authorization exchange.
#[must_use = "The status of the authorization exchange must be checked, as a failure is not reported as an error."]
#[derive(PartialEq, Eq, Debug)]
pub struct AuthorizationResponse {
    /// Whether the authorization attempt succeeded.
    pub status: ResponseStatus,

    /// Arguments returned by the server.
    pub arguments: Vec<Argument>,

    /// A message intended to be presented to the user.
    pub message: String,

    /// Console/administrative data from the server.
    pub data: Vec<u8>,
}

/// The server's response to an accounting record.
#[derive(PartialEq, Eq, Debug)]
pub struct AccountingResponse {
    /// The message that can be displayed to the user connected to the client.
    pub message: String,

    /// An administrative log message.
    pub data: Vec<u8>,
}
