use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tacacs_plus::{
    Argument, Client, ClientError, ConnectionFactory, ConnectionFuture, ContextBuilder,
    ResponseStatus, SessionContext,
};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use super::{AaaConfig, AaaError, Resolver};
use crate::CallContext;

/// Terminal reported to the TACACS+ server for every call.
const TERMINAL: &str = "ttyS0";

/// Value of the `service` attribute in authorization & accounting requests.
const SERVICE: &str = "shell";

/// Result message for calls that completed without a backend error.
pub const NO_ERROR: &str = "no error";

const ERROR_ATTRIBUTE: &str = "err_msg";

// name + delimiter + value must fit in one length byte
const ERROR_MESSAGE_LIMIT: usize = u8::MAX as usize - ERROR_ATTRIBUTE.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Authentication,
    Authorization,
}

impl Step {
    fn denial(self) -> AaaError {
        match self {
            Self::Authentication => AaaError::AuthenticationFailed,
            Self::Authorization => AaaError::AuthorizationFailed,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => f.write_str("authentication"),
            Self::Authorization => f.write_str("authorization"),
        }
    }
}

/// A failed exchange that the fallback policy decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// The server couldn't be resolved, connected to or talked to.
    Unreachable,

    /// The server answered, but not with a clear pass or fail.
    Ambiguous,
}

/// Sorts client errors into policy failures; `None` for requests that couldn't be built locally.
fn classify(error: &ClientError) -> Option<Failure> {
    match error {
        ClientError::ConnectError(_) | ClientError::IOError(_) => Some(Failure::Unreachable),
        ClientError::PasswordTooLong
        | ClientError::InvalidContext
        | ClientError::InvalidArgument(_)
        | ClientError::InvalidArgumentText
        | ClientError::TooManyArguments
        | ClientError::UnsupportedAuthenticationType(_) => None,
        _ => Some(Failure::Ambiguous),
    }
}

/// Whether the rest of the call should skip the server: it couldn't be connected to, or the
/// connection broke or went silent mid-exchange.
fn lost_server(error: &ClientError) -> bool {
    matches!(error, ClientError::ConnectError(_) | ClientError::IOError(_))
}

/// Makes a backend error message fit in an `err_msg` attribute.
fn error_attribute_value(message: &str) -> String {
    message
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c
            } else {
                ' '
            }
        })
        .take(ERROR_MESSAGE_LIMIT)
        .collect()
}

async fn connect(address: SocketAddr, timeout: Duration) -> io::Result<Compat<TcpStream>> {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(stream) => stream.map(TokioAsyncWriteCompatExt::compat_write),
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connecting to {address} timed out"),
        )),
    }
}

fn session_context(context: &CallContext) -> SessionContext {
    ContextBuilder::new(context.username())
        .port(TERMINAL)
        .remote_address(context.remote_address())
        .build()
}

fn command_arguments(context: &CallContext) -> Vec<Argument> {
    vec![
        Argument::required("service", SERVICE),
        Argument::required("cmd", context.method_name()),
    ]
}

/// Applies TACACS+ authentication, authorization and accounting to calls, along with the
/// fallback policy for when the server can't give an answer.
///
/// All operations are no-ops when no server is configured.
#[derive(Debug)]
pub struct AaaController {
    config: AaaConfig,
    resolver: Option<Resolver>,
}

impl AaaController {
    pub fn new(config: AaaConfig) -> Self {
        let resolver = config
            .server_address
            .as_deref()
            .filter(|address| !address.is_empty())
            .map(Resolver::new);

        Self { config, resolver }
    }

    /// Whether a TACACS+ server is configured.
    pub fn is_enabled(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn config(&self) -> &AaaConfig {
        &self.config
    }

    /// Prepares a client for a single exchange, marking the call if the server can't be resolved.
    async fn client(
        &self,
        resolver: &Resolver,
        context: &mut CallContext,
    ) -> io::Result<Client<Compat<TcpStream>>> {
        let address = match resolver.resolve().await {
            Ok(address) => address,
            Err(error) => {
                context.connect_failure = true;
                return Err(error);
            }
        };

        let timeout = self.config.connect_timeout;
        let factory: ConnectionFactory<Compat<TcpStream>> =
            Box::new(move || -> ConnectionFuture<Compat<TcpStream>> {
                Box::pin(connect(address, timeout))
            });

        Ok(Client::new(factory, self.config.secret.as_deref()))
    }

    /// Runs one client exchange, failing it as an I/O error if the server takes too long.
    async fn bounded<T, F>(&self, exchange: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let limit = self.config.connect_timeout + self.config.reply_timeout;

        match tokio::time::timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::IOError(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no reply from TACACS+ server within {limit:?}"),
            ))),
        }
    }

    fn fallback<E: fmt::Display>(
        &self,
        step: Step,
        failure: Failure,
        context: &CallContext,
        error: E,
    ) -> Result<(), AaaError> {
        if self.config.fallback_pass {
            warn!(
                method = context.method_name(),
                user = context.username(),
                %error,
                "TACACS+ {step} inconclusive, allowing call under fallback-pass policy"
            );
            Ok(())
        } else {
            warn!(
                method = context.method_name(),
                user = context.username(),
                %error,
                "TACACS+ {step} inconclusive, denying call"
            );

            Err(match failure {
                Failure::Unreachable => AaaError::Unavailable,
                Failure::Ambiguous => step.denial(),
            })
        }
    }

    fn exchange_failed(
        &self,
        step: Step,
        context: &mut CallContext,
        error: ClientError,
    ) -> Result<(), AaaError> {
        if lost_server(&error) {
            context.connect_failure = true;
        }

        match classify(&error) {
            Some(failure) => self.fallback(step, failure, context, error),
            None => {
                warn!(
                    method = context.method_name(),
                    user = context.username(),
                    %error,
                    "TACACS+ {step} request could not be built"
                );
                Err(step.denial())
            }
        }
    }

    /// Authenticates the caller with the credentials in `context`.
    pub async fn authenticate(&self, context: &mut CallContext) -> Result<(), AaaError> {
        let step = Step::Authentication;
        let Some(resolver) = &self.resolver else {
            return Ok(());
        };

        if context.connect_failure {
            return self.fallback(step, Failure::Unreachable, context, "server already unreachable");
        }

        let client = match self.client(resolver, context).await {
            Ok(client) => client,
            Err(error) => return self.fallback(step, Failure::Unreachable, context, error),
        };

        let result = self
            .bounded(client.authenticate(
                &session_context(context),
                context.password().expose(),
                self.config.authentication_type,
            ))
            .await;

        match result {
            Ok(response) if response.status == ResponseStatus::Success => {
                info!(
                    method = context.method_name(),
                    user = context.username(),
                    remote_address = context.remote_address(),
                    "authentication passed"
                );
                Ok(())
            }
            Ok(response) => {
                warn!(
                    method = context.method_name(),
                    user = context.username(),
                    remote_address = context.remote_address(),
                    server_message = %response.message,
                    "authentication failed"
                );
                Err(AaaError::AuthenticationFailed)
            }
            Err(error) => self.exchange_failed(step, context, error),
        }
    }

    /// Authorizes the invoked operation, sent as `cmd`, for the caller.
    pub async fn authorize(&self, context: &mut CallContext) -> Result<(), AaaError> {
        let step = Step::Authorization;
        let Some(resolver) = &self.resolver else {
            return Ok(());
        };

        if context.connect_failure {
            return self.fallback(step, Failure::Unreachable, context, "server already unreachable");
        }

        let client = match self.client(resolver, context).await {
            Ok(client) => client,
            Err(error) => return self.fallback(step, Failure::Unreachable, context, error),
        };

        let result = self
            .bounded(client.authorize(&session_context(context), command_arguments(context)))
            .await;

        match result {
            Ok(response) if response.status == ResponseStatus::Success => {
                info!(
                    method = context.method_name(),
                    user = context.username(),
                    server_message = %response.message,
                    "authorization passed"
                );
                Ok(())
            }
            Ok(response) => {
                warn!(
                    method = context.method_name(),
                    user = context.username(),
                    server_message = %response.message,
                    "authorization denied"
                );
                Err(AaaError::AuthorizationFailed)
            }
            Err(error) => self.exchange_failed(step, context, error),
        }
    }

    /// Opens an accounting session for the call.
    ///
    /// Failures are logged and otherwise ignored; the call proceeds without accounting.
    pub async fn start_accounting(&self, context: &mut CallContext) {
        let Some(resolver) = &self.resolver else {
            return;
        };

        if context.connect_failure {
            debug!(
                method = context.method_name(),
                "skipping accounting start, TACACS+ server unreachable"
            );
            return;
        }

        let client = match self.client(resolver, context).await {
            Ok(client) => client,
            Err(error) => {
                warn!(method = context.method_name(), %error, "accounting start failed");
                return;
            }
        };

        match self
            .bounded(client.start_task(&session_context(context), command_arguments(context)))
            .await
        {
            Ok((task, _)) => {
                info!(
                    method = context.method_name(),
                    user = context.username(),
                    task_id = task.id(),
                    "accounting started"
                );
                context.task = Some(task);
            }
            Err(error) => {
                if lost_server(&error) {
                    context.connect_failure = true;
                }
                warn!(method = context.method_name(), %error, "accounting start failed");
            }
        }
    }

    /// Closes the call's accounting session, if one was opened.
    ///
    /// `result_message` is sent as `err_msg` unless it is [`NO_ERROR`]. Failures are only logged.
    pub async fn stop_accounting(&self, context: &mut CallContext, result_message: &str) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        let Some(task) = context.task.take() else {
            return;
        };

        let mut arguments = command_arguments(context);
        if result_message != NO_ERROR {
            arguments.push(Argument::required(
                ERROR_ATTRIBUTE,
                error_attribute_value(result_message),
            ));
        }

        let client = match self.client(resolver, context).await {
            Ok(client) => client,
            Err(error) => {
                warn!(
                    method = context.method_name(),
                    task_id = task.id(),
                    %error,
                    "accounting stop failed"
                );
                return;
            }
        };

        match self
            .bounded(client.stop_task(&session_context(context), &task, arguments))
            .await
        {
            Ok(_) => info!(
                method = context.method_name(),
                user = context.username(),
                task_id = task.id(),
                result = result_message,
                "accounting stopped"
            ),
            Err(error) => warn!(
                method = context.method_name(),
                task_id = task.id(),
                %error,
                "accounting stop failed"
            ),
        }
    }
}
