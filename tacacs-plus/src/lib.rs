//! An asynchronous TACACS+ ([RFC8907]) client, independent of any particular async runtime.
//!
//! Connections are produced on demand by a [`ConnectionFactory`]; every authentication,
//! authorization or accounting exchange runs on its own fresh connection, which is closed
//! as soon as the exchange completes.
//!
//! [RFC8907]: https://www.rfc-editor.org/rfc/rfc8907.html

pub use tacacs_plus_protocol as protocol;
pub use tacacs_plus_protocol::{AuthenticationMethod, AuthenticationType, PrivilegeLevel};

mod argument;
pub use argument::Argument;

mod client;
pub use client::{Client, ClientError, ConnectionFactory, ConnectionFuture, MAX_BODY_LENGTH};
pub use client::{ContextBuilder, SessionContext};
pub use client::{
    AccountingResponse, AuthenticationResponse, AuthorizationResponse, ResponseStatus,
};

mod task;
pub use task::Task;
