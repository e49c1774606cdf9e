//! An in-process OpenOLT agent and proxy wired together over loopback.

#![allow(dead_code)]

pub mod tacacs;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint, Server};
use tonic::{Request, Response, Status};

use tacacs_auth_proxy::proto::openolt::openolt_client::OpenoltClient;
use tacacs_auth_proxy::proto::openolt::openolt_server::{Openolt, OpenoltServer};
use tacacs_auth_proxy::proto::openolt::{
    DeviceInfo, Empty, Flow, Group, Heartbeat, Indication, Interface, IntfIndication, OmciMsg,
    Onu, OnuItuPonAlarm, OnuLogicalDistance, OnuPacket, UplinkPacket,
};
use tacacs_auth_proxy::proto::tech_profile::{TrafficQueues, TrafficSchedulers};
use tacacs_auth_proxy::{AaaConfig, AaaController, Backend, Mediator, OpenoltProxy};
use tacacs_plus::AuthenticationType;

pub use tacacs::{Record, Script, TacacsServer, SECRET};

pub const HEARTBEAT_SIGNATURE: u32 = 0x0bad_cafe;
pub const REBOOT_REFUSED: &str = "reboot in progress";

/// `Basic` credentials for `admin:secret`.
pub const ADMIN_CREDENTIALS: &str = "Basic YWRtaW46c2VjcmV0";

/// A backend agent that records which operations reached it.
#[derive(Debug, Clone, Default)]
pub struct FakeAgent {
    calls: Arc<Mutex<Vec<&'static str>>>,
    indications: Vec<Indication>,
    hold_indications_open: bool,
}

impl FakeAgent {
    pub fn with_indications(indications: Vec<Indication>, hold_open: bool) -> Self {
        Self {
            indications,
            hold_indications_open: hold_open,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

macro_rules! fake_agent {
    ($($method:ident($request:ty) -> $response:ty;)*) => {
        #[tonic::async_trait]
        impl Openolt for FakeAgent {
            $(
                async fn $method(&self, _: Request<$request>) -> Result<Response<$response>, Status> {
                    self.record(stringify!($method));
                    Ok(Response::new(<$response>::default()))
                }
            )*

            async fn heartbeat_check(&self, _: Request<Empty>) -> Result<Response<Heartbeat>, Status> {
                self.record("heartbeat_check");
                Ok(Response::new(Heartbeat {
                    heartbeat_signature: HEARTBEAT_SIGNATURE,
                }))
            }

            async fn get_pon_if(
                &self,
                request: Request<Interface>,
            ) -> Result<Response<IntfIndication>, Status> {
                self.record("get_pon_if");
                Ok(Response::new(IntfIndication {
                    intf_id: request.into_inner().intf_id,
                    oper_state: "up".to_owned(),
                }))
            }

            async fn reboot(&self, _: Request<Empty>) -> Result<Response<Empty>, Status> {
                self.record("reboot");
                Err(Status::unavailable(REBOOT_REFUSED))
            }

            type EnableIndicationStream = ReceiverStream<Result<Indication, Status>>;

            async fn enable_indication(
                &self,
                _: Request<Empty>,
            ) -> Result<Response<Self::EnableIndicationStream>, Status> {
                self.record("enable_indication");

                let (sender, receiver) = mpsc::channel(4);
                let indications = self.indications.clone();
                let hold_open = self.hold_indications_open;
                tokio::spawn(async move {
                    for indication in indications {
                        if sender.send(Ok(indication)).await.is_err() {
                            return;
                        }
                    }
                    if hold_open {
                        sender.closed().await;
                    }
                });

                Ok(Response::new(ReceiverStream::new(receiver)))
            }
        }
    };
}

fake_agent! {
    disable_olt(Empty) -> Empty;
    reenable_olt(Empty) -> Empty;
    activate_onu(Onu) -> Empty;
    deactivate_onu(Onu) -> Empty;
    delete_onu(Onu) -> Empty;
    omci_msg_out(OmciMsg) -> Empty;
    onu_packet_out(OnuPacket) -> Empty;
    uplink_packet_out(UplinkPacket) -> Empty;
    flow_add(Flow) -> Empty;
    flow_remove(Flow) -> Empty;
    enable_pon_if(Interface) -> Empty;
    disable_pon_if(Interface) -> Empty;
    collect_statistics(Empty) -> Empty;
    get_device_info(Empty) -> DeviceInfo;
    create_traffic_schedulers(TrafficSchedulers) -> Empty;
    remove_traffic_schedulers(TrafficSchedulers) -> Empty;
    create_traffic_queues(TrafficQueues) -> Empty;
    remove_traffic_queues(TrafficQueues) -> Empty;
    perform_group_operation(Group) -> Empty;
    delete_group(Group) -> Empty;
    onu_itu_pon_alarm_set(OnuItuPonAlarm) -> Empty;
    get_logical_onu_distance_zero(Onu) -> OnuLogicalDistance;
    get_logical_onu_distance(Onu) -> OnuLogicalDistance;
}

pub async fn bind() -> (SocketAddr, TcpListenerStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    (address, TcpListenerStream::new(listener))
}

/// AAA settings pointing at `server` with the shared test secret.
pub fn aaa_config(server: SocketAddr, fallback_pass: bool) -> AaaConfig {
    AaaConfig {
        server_address: Some(server.to_string()),
        secret: Some(SECRET.to_owned()),
        fallback_pass,
        connect_timeout: Duration::from_secs(2),
        reply_timeout: Duration::from_secs(2),
        authentication_type: AuthenticationType::Pap,
    }
}

/// Serves a proxy in front of the agent listening on `agent_address`, returning the
/// proxy's address.
pub async fn start_proxy(config: AaaConfig, agent_address: SocketAddr) -> SocketAddr {
    let backend = Endpoint::from_shared(format!("http://{agent_address}"))
        .unwrap()
        .connect_lazy();
    let proxy = OpenoltProxy::new(Mediator::new(
        Arc::new(AaaController::new(config)),
        Backend::new(backend),
    ));

    let (proxy_address, proxy_incoming) = bind().await;
    tokio::spawn(
        Server::builder()
            .add_service(proxy)
            .serve_with_incoming(proxy_incoming),
    );

    proxy_address
}

/// Serves `agent` and a proxy in front of it, returning a client connected to the proxy.
pub async fn start(config: AaaConfig, agent: FakeAgent) -> OpenoltClient<Channel> {
    let (agent_address, agent_incoming) = bind().await;
    tokio::spawn(
        Server::builder()
            .add_service(OpenoltServer::new(agent))
            .serve_with_incoming(agent_incoming),
    );

    let proxy_address = start_proxy(config, agent_address).await;
    OpenoltClient::connect(format!("http://{proxy_address}"))
        .await
        .unwrap()
}

/// Wraps `message` in a request carrying `credentials` as its authorization metadata.
pub fn authorized<T>(message: T, credentials: &str) -> Request<T> {
    let mut request = Request::new(message);
    let value: MetadataValue<_> = credentials.parse().unwrap();
    request.metadata_mut().insert("authorization", value);
    request
}

/// Polls `condition` until it holds, panicking after a few seconds.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}
