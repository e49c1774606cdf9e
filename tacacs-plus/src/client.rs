//! An implementation of an RFC8907 TACACS+ client.

use std::time::SystemTime;

use byteorder::{ByteOrder, NetworkEndian};
use futures::io;
use futures::{AsyncRead, AsyncReadExt};
use futures::{AsyncWrite, AsyncWriteExt};
use rand::Rng;
use thiserror::Error;

use tacacs_plus_protocol::{self as protocol, Arguments};
use tacacs_plus_protocol::{accounting, authentication, authorization};
use tacacs_plus_protocol::{
    AuthenticationContext, AuthenticationService, AuthenticationType, Deserialize, Serialize,
};
use tacacs_plus_protocol::{HeaderInfo, MajorVersion, MinorVersion, Version};
use tacacs_plus_protocol::{Packet, PacketBody, PacketFlags};

use crate::{Argument, Task};

mod connection;
pub use connection::{ConnectionFactory, ConnectionFuture};

mod response;
pub use response::{AccountingResponse, AuthenticationResponse, AuthorizationResponse, ResponseStatus};

mod context;
pub use context::{ContextBuilder, SessionContext};

/// A TACACS+ client.
pub struct Client<S: AsyncRead + AsyncWrite + Unpin> {
    /// Opens a new connection for every exchange.
    connection_factory: ConnectionFactory<S>,

    /// The shared secret used for packet obfuscation, if provided.
    secret: Option<Vec<u8>>,
}

/// An error during a TACACS+ exchange.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection to the server could not be established.
    #[error("failed to connect to TACACS+ server: {0}")]
    ConnectError(#[source] io::Error),

    /// An error occurred when reading/writing a packet.
    #[error(transparent)]
    IOError(#[from] io::Error),

    /// The server ended an authentication session with a status that is neither a pass nor a fail.
    #[error("authentication ended with status {status:?}: {message}")]
    AuthenticationError {
        /// The status received from the server.
        status: authentication::Status,

        /// The message sent by the server.
        message: String,

        /// The data received from the server.
        data: Vec<u8>,
    },

    /// The server replied to an authorization request with an error status.
    #[error("authorization ended with status {status:?}: {message}")]
    AuthorizationError {
        /// The status received from the server.
        status: authorization::Status,

        /// The message sent by the server.
        message: String,

        /// The data received from the server.
        data: Vec<u8>,
    },

    /// The server did not acknowledge an accounting record.
    #[error("accounting record rejected with status {status:?}: {message}")]
    AccountingError {
        /// The status received from the server.
        status: accounting::Status,

        /// The message sent by the server.
        message: String,

        /// The data received from the server.
        data: Vec<u8>,
    },

    /// Error when serializing a packet to the wire.
    #[error(transparent)]
    SerializeError(#[from] protocol::SerializeError),

    /// Invalid packet received from a server.
    #[error("invalid packet received from server: {0}")]
    InvalidPacketReceived(#[from] protocol::DeserializeError),

    /// The provided password didn't fit in a start or continue packet.
    #[error("password is too long to be sent in a packet")]
    PasswordTooLong,

    /// Context had invalid field.
    #[error("session context had invalid field(s)")]
    InvalidContext,

    /// An argument could not be encoded.
    #[error(transparent)]
    InvalidArgument(#[from] protocol::InvalidArgument),

    /// An argument name or value was not printable ASCII.
    #[error("argument name/value was not printable ASCII")]
    InvalidArgumentText,

    /// More arguments were provided than fit in a packet.
    #[error("too many arguments provided (max 255)")]
    TooManyArguments,

    /// This client only performs PAP & ASCII logins.
    #[error("unsupported authentication type {0:?}")]
    UnsupportedAuthenticationType(AuthenticationType),

    /// A reply's sequence number didn't match the one expected in the session.
    #[error("sequence number mismatch: expected {expected}, got {actual}")]
    SequenceNumberMismatch {
        /// The expected sequence number.
        expected: u8,

        /// The sequence number in the received packet.
        actual: u8,
    },

    /// A reply's session id didn't match the session it was received in.
    #[error("session id mismatch: expected {expected:#x}, got {actual:#x}")]
    SessionIdMismatch {
        /// The id of the ongoing session.
        expected: u32,

        /// The id in the received packet.
        actual: u32,
    },

    /// The server kept the session going until sequence numbers ran out.
    #[error("session sequence number overflowed")]
    SequenceNumberOverflow,

    /// A reply header announced a body larger than any valid reply.
    #[error("reply body length {0} is larger than any valid reply")]
    ReplyTooLong(u32),
}

/// Upper bound on the body length of a reply.
///
/// The largest well-formed reply is an authorization reply with two full 16-bit
/// fields and 255 arguments of 255 bytes each, which stays under this limit.
pub const MAX_BODY_LENGTH: u32 = 1 << 18;

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S> {
    /// Initializes a new TACACS+ client that uses the provided factory to connect to a TACACS+ server.
    ///
    /// If no secret (or an empty one) is provided, packets are not obfuscated. Per [RFC8907 section 4.5],
    /// unobfuscated packet transfer MUST NOT be used in production, so prefer to provide a secret.
    ///
    /// [RFC8907 section 10.5.1] specifies that clients SHOULD NOT allow secret keys less
    /// than 16 characters in length. This constructor does not check for that, but
    /// consider yourself warned.
    ///
    /// [RFC8907 section 4.5]: https://www.rfc-editor.org/rfc/rfc8907.html#section-4.5-16
    /// [RFC8907 section 10.5.1]: https://www.rfc-editor.org/rfc/rfc8907.html#section-10.5.1-3.8.1
    pub fn new<K: AsRef<[u8]>>(connection_factory: ConnectionFactory<S>, secret: Option<K>) -> Self {
        let secret = secret
            .map(|key| key.as_ref().to_owned())
            .filter(|key| !key.is_empty());

        Self {
            connection_factory,
            secret,
        }
    }

    /// Returns true if packets are obfuscated with a shared secret.
    pub fn is_obfuscated(&self) -> bool {
        self.secret.is_some()
    }

    async fn connect(&self) -> Result<S, ClientError> {
        (self.connection_factory)()
            .await
            .map_err(ClientError::ConnectError)
    }

    async fn write_packet<B: PacketBody + Serialize>(
        &self,
        connection: &mut S,
        packet: Packet<B>,
    ) -> Result<(), ClientError> {
        // allocate zero-filled buffer large enough to hold packet
        let mut packet_buffer = vec![0; packet.wire_size()];

        // obfuscate packet if we have a secret key
        if let Some(secret_key) = &self.secret {
            packet.serialize(secret_key, &mut packet_buffer)?;
        } else {
            packet.serialize_unobfuscated(&mut packet_buffer)?;
        }

        connection.write_all(&packet_buffer).await?;
        connection.flush().await.map_err(Into::into)
    }

    /// Reads the raw bytes of a full packet from the connection.
    async fn receive_packet_bytes(&self, connection: &mut S) -> Result<Vec<u8>, ClientError> {
        let mut buffer = vec![0; HeaderInfo::HEADER_SIZE_BYTES];
        connection.read_exact(&mut buffer).await?;

        // read rest of body based on length reported in header
        let body_length = NetworkEndian::read_u32(&buffer[8..12]);
        if body_length > MAX_BODY_LENGTH {
            return Err(ClientError::ReplyTooLong(body_length));
        }
        buffer.resize(HeaderInfo::HEADER_SIZE_BYTES + body_length as usize, 0);
        connection
            .read_exact(&mut buffer[HeaderInfo::HEADER_SIZE_BYTES..])
            .await?;

        Ok(buffer)
    }

    /// Unobfuscates & deserializes a received packet, checking that it belongs to the current session.
    fn parse_packet<'raw, B: PacketBody + Deserialize<'raw>>(
        &self,
        buffer: &'raw mut [u8],
        expected_header: &HeaderInfo,
    ) -> Result<Packet<B>, ClientError> {
        let packet: Packet<B> = if let Some(secret_key) = &self.secret {
            Packet::deserialize(secret_key, buffer)?
        } else {
            Packet::deserialize_unobfuscated(buffer)?
        };

        let header = packet.header();

        if header.session_id() != expected_header.session_id() {
            return Err(ClientError::SessionIdMismatch {
                expected: expected_header.session_id(),
                actual: header.session_id(),
            });
        }

        if header.sequence_number() != expected_header.sequence_number() {
            return Err(ClientError::SequenceNumberMismatch {
                expected: expected_header.sequence_number(),
                actual: header.sequence_number(),
            });
        }

        Ok(packet)
    }

    fn make_header(&self, sequence_number: u8, minor_version: MinorVersion, session_id: u32) -> HeaderInfo {
        // the unencrypted flag is set during serialization as appropriate; connections are never reused
        HeaderInfo::new(
            Version::new(MajorVersion::RFC8907, minor_version),
            sequence_number,
            PacketFlags::empty(),
            session_id,
        )
    }

    /// Header a server reply should carry in response to a client packet.
    fn reply_header(request_header: &HeaderInfo) -> Result<HeaderInfo, ClientError> {
        let sequence_number = request_header
            .sequence_number()
            .checked_add(1)
            .ok_or(ClientError::SequenceNumberOverflow)?;

        Ok(HeaderInfo::new(
            request_header.version(),
            sequence_number,
            request_header.flags(),
            request_header.session_id(),
        ))
    }

    /// Closes a connection after an exchange.
    async fn close(connection: &mut S) {
        // the outcome of the exchange is already decided at this point, so a failed close is not reported
        let _ = connection.close().await;
    }

    /// Authenticates a user against a TACACS+ server, via either PAP or ASCII login.
    ///
    /// For PAP the password is sent in the start packet; for ASCII it is only sent once the server
    /// prompts for it. In both cases, a GETUSER/GETPASS prompt from the server is answered with
    /// the context's user or the password, respectively.
    ///
    /// NOTE: Even if this function returns `Ok`, the authentication may not have succeeded; make sure to check
    /// the [`status`](AuthenticationResponse::status) field of the returned response.
    pub async fn authenticate(
        &self,
        context: &SessionContext,
        password: &str,
        authentication_type: AuthenticationType,
    ) -> Result<AuthenticationResponse, ClientError> {
        let start_data = match authentication_type {
            AuthenticationType::Pap => {
                if password.len() > u8::MAX as usize {
                    return Err(ClientError::PasswordTooLong);
                }
                Some(password.as_bytes())
            }
            AuthenticationType::Ascii => None,
            other => return Err(ClientError::UnsupportedAuthenticationType(other)),
        };

        let minor_version = authentication_type
            .required_minor_version()
            .unwrap_or(MinorVersion::Default);
        let session_id: u32 = rand::thread_rng().gen();

        let start_header = self.make_header(1, minor_version, session_id);
        let start_packet = Packet::new(
            start_header,
            authentication::Start::new(
                authentication::Action::Login,
                AuthenticationContext {
                    privilege_level: context.privilege_level(),
                    authentication_type,
                    service: AuthenticationService::Login,
                },
                context.as_user_information()?,
                start_data,
            )
            .map_err(|_| ClientError::PasswordTooLong)?,
        )
        .ok_or(ClientError::InvalidContext)?;

        let mut connection = self.connect().await?;
        let result = self
            .authentication_exchange(&mut connection, context, password, start_header, start_packet)
            .await;
        Self::close(&mut connection).await;

        result
    }

    async fn authentication_exchange(
        &self,
        connection: &mut S,
        context: &SessionContext,
        password: &str,
        start_header: HeaderInfo,
        start_packet: Packet<authentication::Start<'_>>,
    ) -> Result<AuthenticationResponse, ClientError> {
        self.write_packet(connection, start_packet).await?;
        let mut expected_header = Self::reply_header(&start_header)?;

        loop {
            let mut buffer = self.receive_packet_bytes(connection).await?;
            let reply: Packet<authentication::Reply> =
                self.parse_packet(&mut buffer, &expected_header)?;
            let reply = reply.body();

            let user_message = match reply.status {
                authentication::Status::Pass | authentication::Status::Fail => {
                    let status = if reply.status == authentication::Status::Pass {
                        ResponseStatus::Success
                    } else {
                        ResponseStatus::Failure
                    };

                    return Ok(AuthenticationResponse {
                        status,
                        message: reply.server_message.to_string(),
                        data: reply.data.to_vec(),
                    });
                }
                authentication::Status::GetPassword => password.as_bytes(),
                authentication::Status::GetUser => context.user().as_bytes(),
                bad_status => {
                    return Err(ClientError::AuthenticationError {
                        status: bad_status,
                        message: reply.server_message.to_string(),
                        data: reply.data.to_vec(),
                    })
                }
            };

            // continue packets follow the server reply in sequence
            let continue_header = Self::reply_header(&expected_header)?;
            let continue_packet = Packet::new(
                continue_header,
                authentication::Continue::new(
                    Some(user_message),
                    None,
                    authentication::ContinueFlags::empty(),
                )
                .ok_or(ClientError::PasswordTooLong)?,
            )
            .ok_or(ClientError::InvalidContext)?;

            self.write_packet(connection, continue_packet).await?;
            expected_header = Self::reply_header(&continue_header)?;
        }
    }

    /// Performs TACACS+ authorization for a user with the provided arguments.
    ///
    /// NOTE: The returned response may indicate a failure even if `Ok`; make sure to check
    /// its [`status`](AuthorizationResponse::status).
    pub async fn authorize(
        &self,
        context: &SessionContext,
        arguments: Vec<Argument>,
    ) -> Result<AuthorizationResponse, ClientError> {
        let borrowed_arguments = arguments
            .iter()
            .map(Argument::borrowed)
            .collect::<Result<Vec<_>, _>>()?;

        let session_id: u32 = rand::thread_rng().gen();
        let request_header = self.make_header(1, MinorVersion::Default, session_id);
        let request_packet = Packet::new(
            request_header,
            authorization::Request {
                method: context.authentication_method(),
                authentication_context: AuthenticationContext {
                    privilege_level: context.privilege_level(),
                    authentication_type: AuthenticationType::NotSet,
                    service: AuthenticationService::Login,
                },
                user_information: context.as_user_information()?,
                arguments: Arguments::new(borrowed_arguments)
                    .ok_or(ClientError::TooManyArguments)?,
            },
        )
        .ok_or(ClientError::InvalidContext)?;

        let mut connection = self.connect().await?;
        let result: Result<AuthorizationResponse, ClientError> = async {
            self.write_packet(&mut connection, request_packet).await?;

            let mut buffer = self.receive_packet_bytes(&mut connection).await?;
            let reply: Packet<authorization::Reply> =
                self.parse_packet(&mut buffer, &Self::reply_header(&request_header)?)?;
            let reply = reply.body();

            let status = match reply.status {
                authorization::Status::PassAdd | authorization::Status::PassReplace => {
                    ResponseStatus::Success
                }
                authorization::Status::Fail => ResponseStatus::Failure,
                bad_status => {
                    return Err(ClientError::AuthorizationError {
                        status: bad_status,
                        message: reply.server_message.to_string(),
                        data: reply.data.to_vec(),
                    })
                }
            };

            Ok(AuthorizationResponse {
                status,
                arguments: reply.arguments.iter().map(Argument::from).collect(),
                message: reply.server_message.to_string(),
                data: reply.data.to_vec(),
            })
        }
        .await;
        Self::close(&mut connection).await;

        result
    }

    /// Sends an accounting record and checks that the server acknowledged it.
    async fn account(
        &self,
        context: &SessionContext,
        flags: accounting::Flags,
        arguments: Vec<Argument>,
    ) -> Result<AccountingResponse, ClientError> {
        let borrowed_arguments = arguments
            .iter()
            .map(Argument::borrowed)
            .collect::<Result<Vec<_>, _>>()?;

        let session_id: u32 = rand::thread_rng().gen();
        let request_header = self.make_header(1, MinorVersion::Default, session_id);
        let request_packet = Packet::new(
            request_header,
            accounting::Request {
                flags,
                authentication_method: context.authentication_method(),
                authentication: AuthenticationContext {
                    privilege_level: context.privilege_level(),
                    authentication_type: AuthenticationType::NotSet,
                    service: AuthenticationService::Login,
                },
                user_information: context.as_user_information()?,
                arguments: Arguments::new(borrowed_arguments)
                    .ok_or(ClientError::TooManyArguments)?,
            },
        )
        .ok_or(ClientError::InvalidContext)?;

        let mut connection = self.connect().await?;
        let result: Result<AccountingResponse, ClientError> = async {
            self.write_packet(&mut connection, request_packet).await?;

            let mut buffer = self.receive_packet_bytes(&mut connection).await?;
            let reply: Packet<accounting::Reply> =
                self.parse_packet(&mut buffer, &Self::reply_header(&request_header)?)?;
            let reply = reply.body();

            match reply.status {
                accounting::Status::Success => Ok(AccountingResponse {
                    message: reply.server_message.to_string(),
                    data: reply.data.to_vec(),
                }),
                // FOLLOW is treated as an error too, mirroring its handling in authentication
                bad_status => Err(ClientError::AccountingError {
                    status: bad_status,
                    message: reply.server_message.to_string(),
                    data: reply.data.to_vec(),
                }),
            }
        }
        .await;
        Self::close(&mut connection).await;

        result
    }

    /// Starts tracking a new task via a TACACS+ accounting start record.
    ///
    /// The `task_id` and `start_time` arguments from [RFC8907 section 8.3] are prepended to the provided arguments.
    ///
    /// [RFC8907 section 8.3]: https://www.rfc-editor.org/rfc/rfc8907.html#name-accounting-arguments
    pub async fn start_task(
        &self,
        context: &SessionContext,
        arguments: Vec<Argument>,
    ) -> Result<(Task, AccountingResponse), ClientError> {
        let task = Task::new();

        let mut full_arguments = task.start_arguments();
        full_arguments.extend(arguments);

        let response = self
            .account(context, accounting::Flags::StartRecord, full_arguments)
            .await?;

        Ok((task, response))
    }

    /// Signals to the TACACS+ server that a task has completed.
    ///
    /// The `task_id`, `stop_time` and `elapsed_time` arguments are prepended to the provided arguments.
    pub async fn stop_task(
        &self,
        context: &SessionContext,
        task: &Task,
        arguments: Vec<Argument>,
    ) -> Result<AccountingResponse, ClientError> {
        let mut full_arguments = task.stop_arguments(SystemTime::now());
        full_arguments.extend(arguments);

        self.account(context, accounting::Flags::StopRecord, full_arguments)
            .await
    }
}
