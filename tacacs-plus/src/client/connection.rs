use std::future::Future;
use std::io;
use std::pin::Pin;

/// The pending result of opening one connection to a TACACS+ server.
pub type ConnectionFuture<S> = Pin<Box<dyn Future<Output = io::Result<S>> + Send>>;

/// Opens connections for a [`Client`](super::Client).
///
/// Called at the start of every exchange; the connection is dropped once the exchange
/// finishes, so each call must return a new one. Errors returned here are reported as
/// [`ClientError::ConnectError`](super::ClientError::ConnectError).
///
/// # Examples
///
/// A factory for tokio TCP streams, bridged to the `futures` I/O traits:
///
/// ```no_run
/// use std::net::SocketAddr;
///
/// use tokio::net::TcpStream;
/// use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
///
/// use tacacs_plus::{ConnectionFactory, ConnectionFuture};
///
/// fn tcp_factory(server: SocketAddr) -> ConnectionFactory<Compat<TcpStream>> {
///     Box::new(move || -> ConnectionFuture<Compat<TcpStream>> {
///         Box::pin(async move {
///             TcpStream::connect(server)
///                 .await
///                 .map(TokioAsyncWriteCompatExt::compat_write)
///         })
///     })
/// }
/// ```
pub type ConnectionFactory<S> = Box<dyn Fn() -> ConnectionFuture<S> + Send + Sync>;
