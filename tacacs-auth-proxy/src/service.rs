use std::convert::Infallible;
use std::task::{Context, Poll};

use bytes::Bytes;
use tonic::codec::Streaming;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::{http, Body, BoxFuture, Service, StdError};
use tonic::server::{Grpc, NamedService, ServerStreamingService, UnaryService};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

use crate::codec::PassThroughCodec;
use crate::mediator::RelayStream;
use crate::Mediator;

/// Fully qualified name of the relayed gRPC service.
pub const SERVICE_NAME: &str = "openolt.Openolt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unary,
    ServerStreaming,
}

/// One relayed operation: its request path and the name sent in the TACACS+ `cmd` attribute.
#[derive(Debug)]
struct Operation {
    path: &'static str,
    name: &'static str,
    kind: Kind,
}

const fn unary(path: &'static str, name: &'static str) -> Operation {
    Operation {
        path,
        name,
        kind: Kind::Unary,
    }
}

static OPERATIONS: [Operation; 27] = [
    unary("/openolt.Openolt/DisableOlt", "disableolt"),
    unary("/openolt.Openolt/ReenableOlt", "reenableolt"),
    unary("/openolt.Openolt/ActivateOnu", "activateonu"),
    unary("/openolt.Openolt/DeactivateOnu", "deactivateonu"),
    unary("/openolt.Openolt/DeleteOnu", "deleteonu"),
    unary("/openolt.Openolt/OmciMsgOut", "omcimsgout"),
    unary("/openolt.Openolt/OnuPacketOut", "onupacketout"),
    unary("/openolt.Openolt/UplinkPacketOut", "uplinkpacketout"),
    unary("/openolt.Openolt/FlowAdd", "flowadd"),
    unary("/openolt.Openolt/FlowRemove", "flowremove"),
    unary("/openolt.Openolt/HeartbeatCheck", "heartbeatcheck"),
    unary("/openolt.Openolt/EnablePonIf", "enableponif"),
    unary("/openolt.Openolt/GetPonIf", "getponif"),
    unary("/openolt.Openolt/DisablePonIf", "disableponif"),
    unary("/openolt.Openolt/CollectStatistics", "collectstatistics"),
    unary("/openolt.Openolt/Reboot", "reboot"),
    unary("/openolt.Openolt/GetDeviceInfo", "getdeviceinfo"),
    unary("/openolt.Openolt/CreateTrafficSchedulers", "createtrafficschedulers"),
    unary("/openolt.Openolt/RemoveTrafficSchedulers", "removetrafficschedulers"),
    unary("/openolt.Openolt/CreateTrafficQueues", "createtrafficqueues"),
    unary("/openolt.Openolt/RemoveTrafficQueues", "removetrafficqueues"),
    Operation {
        path: "/openolt.Openolt/EnableIndication",
        name: "enableindication",
        kind: Kind::ServerStreaming,
    },
    unary("/openolt.Openolt/PerformGroupOperation", "performgroupoperation"),
    unary("/openolt.Openolt/DeleteGroup", "deletegroup"),
    unary("/openolt.Openolt/OnuItuPonAlarmSet", "onuituponalarmset"),
    unary("/openolt.Openolt/GetLogicalOnuDistanceZero", "getlogicalonudistancezero"),
    unary("/openolt.Openolt/GetLogicalOnuDistance", "getlogicalonudistance"),
];

fn operation(path: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|operation| operation.path == path)
}

/// The backend OpenOLT agent, called with the raw message bytes received from the caller.
#[derive(Debug, Clone)]
pub struct Backend {
    grpc: tonic::client::Grpc<Channel>,
}

impl Backend {
    pub fn new(channel: Channel) -> Self {
        Self {
            grpc: tonic::client::Grpc::new(channel),
        }
    }

    async fn ready(&mut self) -> Result<(), Status> {
        self.grpc.ready().await.map_err(|error| {
            let error: StdError = error.into();
            Status::unknown(format!("Service was not ready: {error}"))
        })
    }

    async fn unary(
        mut self,
        path: &'static str,
        request: Request<Bytes>,
    ) -> Result<Response<Bytes>, Status> {
        self.ready().await?;
        self.grpc
            .unary(request, PathAndQuery::from_static(path), PassThroughCodec)
            .await
    }

    async fn server_streaming(
        mut self,
        path: &'static str,
        request: Request<Bytes>,
    ) -> Result<Response<Streaming<Bytes>>, Status> {
        self.ready().await?;
        self.grpc
            .server_streaming(request, PathAndQuery::from_static(path), PassThroughCodec)
            .await
    }
}

struct UnaryRelay {
    mediator: Mediator<Backend>,
    operation: &'static Operation,
}

impl UnaryService<Bytes> for UnaryRelay {
    type Response = Bytes;
    type Future = BoxFuture<Response<Bytes>, Status>;

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let mediator = self.mediator.clone();
        let Operation { path, name, .. } = *self.operation;

        Box::pin(async move {
            mediator
                .unary(name, request, |backend, request| backend.unary(path, request))
                .await
        })
    }
}

struct StreamingRelay {
    mediator: Mediator<Backend>,
    operation: &'static Operation,
}

impl ServerStreamingService<Bytes> for StreamingRelay {
    type Response = Bytes;
    type ResponseStream = RelayStream<Bytes>;
    type Future = BoxFuture<Response<Self::ResponseStream>, Status>;

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let mediator = self.mediator.clone();
        let Operation { path, name, .. } = *self.operation;

        Box::pin(async move {
            mediator
                .server_streaming(name, request, |backend, request| {
                    backend.server_streaming(path, request)
                })
                .await
        })
    }
}

/// The OpenOLT service offered to callers; every operation goes through the [`Mediator`]
/// before reaching the backend agent.
///
/// Messages are relayed as received, without being decoded.
#[derive(Debug, Clone)]
pub struct OpenoltProxy {
    mediator: Mediator<Backend>,
}

impl OpenoltProxy {
    pub fn new(mediator: Mediator<Backend>) -> Self {
        Self { mediator }
    }
}

impl NamedService for OpenoltProxy {
    const NAME: &'static str = SERVICE_NAME;
}

impl<B> Service<http::Request<B>> for OpenoltProxy
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        let Some(operation) = operation(request.uri().path()) else {
            let status = Status::unimplemented(format!("unknown method {}", request.uri().path()));
            return Box::pin(async move { Ok(status.into_http()) });
        };

        let mediator = self.mediator.clone();
        Box::pin(async move {
            let mut grpc = Grpc::new(PassThroughCodec);
            let response = match operation.kind {
                Kind::Unary => {
                    grpc.unary(UnaryRelay { mediator, operation }, request)
                        .await
                }
                Kind::ServerStreaming => {
                    grpc.server_streaming(StreamingRelay { mediator, operation }, request)
                        .await
                }
            };

            Ok(response)
        })
    }
}
