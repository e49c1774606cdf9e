use thiserror::Error;
use tonic::Status;

/// Why a call was refused by the AAA layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AaaError {
    /// The call didn't carry usable credentials.
    #[error("Unable to find or extract credentials from incoming gRPC request")]
    MissingCredentials,

    /// The TACACS+ server rejected the credentials.
    #[error("Authentication against TACACS+ server failed")]
    AuthenticationFailed,

    /// The TACACS+ server denied the invoked operation.
    #[error("Authorization of user for invoked operation against TACACS+ server failed")]
    AuthorizationFailed,

    /// The TACACS+ server couldn't be reached and the fallback policy is strict.
    #[error("TACACS+ server unavailable")]
    Unavailable,
}

impl From<AaaError> for Status {
    fn from(error: AaaError) -> Self {
        let message = error.to_string();

        match error {
            AaaError::MissingCredentials => Status::invalid_argument(message),
            AaaError::AuthenticationFailed => Status::unauthenticated(message),
            AaaError::AuthorizationFailed => Status::permission_denied(message),
            AaaError::Unavailable => Status::unavailable(message),
        }
    }
}
