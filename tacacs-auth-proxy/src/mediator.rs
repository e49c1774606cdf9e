use std::future::Future;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use crate::aaa::{AaaController, AaaError, NO_ERROR};
use crate::{credentials, CallContext};

/// Deadline header copied from inbound calls onto the forwarded ones.
const GRPC_TIMEOUT: &str = "grpc-timeout";

/// Accounting result for calls whose caller went away before they completed.
pub const CANCELLED_BY_CLIENT: &str = "call cancelled by client";

/// Messages buffered between the backend stream and the caller.
const STREAM_BUFFER: usize = 16;

/// The stream handed to callers of server-streaming operations.
pub type RelayStream<T> = ReceiverStream<Result<T, Status>>;

/// An accounting session bracketing one forwarded call.
///
/// Dropping an unclosed session (when the caller cancels the call) sends the stop
/// record from a detached task.
struct AccountingSession {
    open: Option<(Arc<AaaController>, CallContext)>,
}

impl AccountingSession {
    async fn start(aaa: Arc<AaaController>, mut context: CallContext) -> Self {
        aaa.start_accounting(&mut context).await;

        Self {
            open: Some((aaa, context)),
        }
    }

    fn disabled() -> Self {
        Self { open: None }
    }

    async fn close(mut self, result_message: &str) {
        if let Some((aaa, mut context)) = self.open.take() {
            aaa.stop_accounting(&mut context, result_message).await;
        }
    }
}

impl Drop for AccountingSession {
    fn drop(&mut self) {
        let Some((aaa, mut context)) = self.open.take() else {
            return;
        };
        let Some(task_id) = context.task_id() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(method = context.method_name(), task_id, "call cancelled, closing accounting");
                runtime.spawn(async move {
                    aaa.stop_accounting(&mut context, CANCELLED_BY_CLIENT).await;
                });
            }
            Err(_) => warn!(
                method = context.method_name(),
                task_id,
                "call cancelled outside of a runtime, accounting stop not sent"
            ),
        }
    }
}

fn status_message(status: &Status) -> &str {
    if status.message().is_empty() {
        status.code().description()
    } else {
        status.message()
    }
}

fn result_message<T>(result: &Result<T, Status>) -> &str {
    match result {
        Ok(_) => NO_ERROR,
        Err(status) => status_message(status),
    }
}

/// Builds the call context from an inbound request and strips it down to what gets forwarded.
///
/// Only the message and the call deadline are passed on; credentials stay with the proxy.
fn split<T>(request: Request<T>) -> (CallContext, Request<T>) {
    let context = credentials::extract(request.metadata(), request.remote_addr());
    let deadline = request.metadata().get(GRPC_TIMEOUT).cloned();

    let mut outbound = Request::new(request.into_inner());
    if let Some(deadline) = deadline {
        outbound.metadata_mut().insert(GRPC_TIMEOUT, deadline);
    }

    (context, outbound)
}

/// Relays a backend stream to the caller, returning the accounting result message.
async fn relay<S, T>(mut inbound: S, sender: mpsc::Sender<Result<T, Status>>) -> String
where
    S: Stream<Item = Result<T, Status>> + Unpin,
{
    loop {
        let item = tokio::select! {
            item = inbound.next() => item,
            () = sender.closed() => return CANCELLED_BY_CLIENT.to_owned(),
        };

        match item {
            Some(Ok(message)) => {
                if sender.send(Ok(message)).await.is_err() {
                    return CANCELLED_BY_CLIENT.to_owned();
                }
            }
            Some(Err(status)) => {
                let message = status_message(&status).to_owned();
                // the caller may already be gone, in which case there's no one to tell
                let _ = sender.send(Err(status)).await;
                return message;
            }
            None => return NO_ERROR.to_owned(),
        }
    }
}

/// Runs every proxied call through authentication, authorization and accounting before
/// handing it to the backend `B`.
#[derive(Debug, Clone)]
pub struct Mediator<B> {
    aaa: Arc<AaaController>,
    backend: B,
}

impl<B: Clone> Mediator<B> {
    pub fn new(aaa: Arc<AaaController>, backend: B) -> Self {
        Self { aaa, backend }
    }

    pub fn aaa(&self) -> &AaaController {
        &self.aaa
    }

    /// Admits a call, opening its accounting session.
    async fn admit(
        &self,
        method: &'static str,
        mut context: CallContext,
    ) -> Result<AccountingSession, AaaError> {
        if !self.aaa.is_enabled() {
            return Ok(AccountingSession::disabled());
        }

        if !context.has_credentials() {
            warn!(
                method,
                remote_address = context.remote_address(),
                "call rejected, no credentials"
            );
            return Err(AaaError::MissingCredentials);
        }

        context.set_method_name(method);
        self.aaa.authenticate(&mut context).await?;
        self.aaa.authorize(&mut context).await?;

        Ok(AccountingSession::start(self.aaa.clone(), context).await)
    }

    /// Proxies a unary call, with `forward` invoking the matching backend method.
    pub async fn unary<Req, Resp, F, Fut>(
        &self,
        method: &'static str,
        request: Request<Req>,
        forward: F,
    ) -> Result<Response<Resp>, Status>
    where
        F: FnOnce(B, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Resp>, Status>>,
    {
        let (context, outbound) = split(request);
        let session = self.admit(method, context).await?;

        debug!(method, "forwarding call");
        let result = forward(self.backend.clone(), outbound).await;

        session.close(result_message(&result)).await;
        result
    }

    /// Proxies a server-streaming call, relaying every backend message to the caller.
    ///
    /// The relay stops when the backend stream ends or fails, or when the caller goes away;
    /// accounting is closed once it does.
    pub async fn server_streaming<Req, T, S, F, Fut>(
        &self,
        method: &'static str,
        request: Request<Req>,
        forward: F,
    ) -> Result<Response<RelayStream<T>>, Status>
    where
        F: FnOnce(B, Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<S>, Status>>,
        S: Stream<Item = Result<T, Status>> + Send + Unpin + 'static,
        T: Send + 'static,
    {
        let (context, outbound) = split(request);
        let session = self.admit(method, context).await?;

        debug!(method, "forwarding streaming call");
        let inbound = match forward(self.backend.clone(), outbound).await {
            Ok(response) => response.into_inner(),
            Err(status) => {
                session.close(status_message(&status)).await;
                return Err(status);
            }
        };

        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let result_message = relay(inbound, sender).await;
            debug!(method, result = %result_message, "stream finished");
            session.close(&result_message).await;
        });

        Ok(Response::new(ReceiverStream::new(receiver)))
    }
}
