//! A scripted in-process TACACS+ server for exercising the client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use tacacs_plus::protocol::{accounting, authentication, authorization};
use tacacs_plus::protocol::{
    Arguments, Deserialize, FieldText, HeaderInfo, Packet, PacketBody, PacketFlags, Serialize,
    Version,
};
use tacacs_plus::{Client, ConnectionFactory};

pub const SECRET: &str = "very secure key that is super secret";

/// What the server saw in a single client packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    AuthenticationStart {
        user: String,
        authentication_type: tacacs_plus::AuthenticationType,
        data: Vec<u8>,
    },
    AuthenticationContinue {
        user_message: Vec<u8>,
    },
    Authorization {
        user: String,
        remote_address: String,
        arguments: Vec<String>,
    },
    Accounting {
        flags: accounting::Flags,
        arguments: Vec<String>,
    },
}

/// How the server replies to each kind of packet.
#[derive(Debug, Clone)]
pub struct Script {
    /// Replies to authentication packets, in order within one session.
    pub authentication: Vec<authentication::Status>,
    pub authorization: authorization::Status,
    pub authorization_arguments: Vec<(&'static str, &'static str, bool)>,
    pub accounting: accounting::Status,
    pub server_message: &'static str,

    /// Added to the correct reply sequence number.
    pub sequence_offset: u8,

    /// XORed with the session id in replies.
    pub session_id_mask: u32,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            authentication: vec![authentication::Status::Pass],
            authorization: authorization::Status::PassAdd,
            authorization_arguments: Vec::new(),
            accounting: accounting::Status::Success,
            server_message: "",
            sequence_offset: 0,
            session_id_mask: 0,
        }
    }
}

pub struct MockServer {
    pub address: SocketAddr,
    pub recorded: Arc<Mutex<Vec<Recorded>>>,
    pub connections: Arc<AtomicUsize>,
    secret: Option<Vec<u8>>,
}

impl MockServer {
    pub async fn start(script: Script, secret: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock server should bind");
        let address = listener.local_addr().expect("listener should have an address");

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let secret = secret.map(|key| key.as_bytes().to_vec());

        let server_recorded = recorded.clone();
        let server_connections = connections.clone();
        let server_secret = secret.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                server_connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(
                    stream,
                    script.clone(),
                    server_secret.clone(),
                    server_recorded.clone(),
                ));
            }
        });

        Self {
            address,
            recorded,
            connections,
            secret,
        }
    }

    pub fn client(&self) -> Client<Compat<TcpStream>> {
        let address = self.address;
        let factory: ConnectionFactory<_> = Box::new(move || {
            TcpStream::connect(address)
                .map(|result| result.map(TokioAsyncWriteCompatExt::compat_write))
                .boxed()
        });

        Client::new(factory, self.secret.as_deref())
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn decode<'raw, B: PacketBody + Deserialize<'raw>>(
    secret: &Option<Vec<u8>>,
    buffer: &'raw mut [u8],
) -> Packet<B> {
    match secret {
        Some(key) => Packet::deserialize(key, buffer),
        None => Packet::deserialize_unobfuscated(buffer),
    }
    .expect("client packet should deserialize")
}

fn encode<B: PacketBody + Serialize>(secret: &Option<Vec<u8>>, packet: Packet<B>) -> Vec<u8> {
    let mut buffer = vec![0; packet.wire_size()];
    match secret {
        Some(key) => packet.serialize(key, &mut buffer),
        None => packet.serialize_unobfuscated(&mut buffer),
    }
    .expect("reply should serialize");
    buffer
}

fn argument_strings(arguments: &Arguments<'_>) -> Vec<String> {
    arguments.iter().map(ToString::to_string).collect()
}

async fn handle_connection(
    mut stream: TcpStream,
    script: Script,
    secret: Option<Vec<u8>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
) {
    let mut authentication_step = 0;

    loop {
        let mut buffer = vec![0u8; HeaderInfo::HEADER_SIZE_BYTES];
        if stream.read_exact(&mut buffer).await.is_err() {
            // client closed the connection
            return;
        }

        let body_length = u32::from_be_bytes([buffer[8], buffer[9], buffer[10], buffer[11]]);
        buffer.resize(HeaderInfo::HEADER_SIZE_BYTES + body_length as usize, 0);
        if stream
            .read_exact(&mut buffer[HeaderInfo::HEADER_SIZE_BYTES..])
            .await
            .is_err()
        {
            return;
        }

        let version = Version::try_from(buffer[0]).expect("client version should be valid");
        let sequence_number = buffer[2];
        let session_id = u32::from_be_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]);
        let reply_header = HeaderInfo::new(
            version,
            sequence_number + 1 + script.sequence_offset,
            PacketFlags::empty(),
            session_id ^ script.session_id_mask,
        );
        let server_message =
            FieldText::try_from(script.server_message).expect("message should be ASCII");

        let reply = match buffer[1] {
            1 => {
                if sequence_number == 1 {
                    let packet: Packet<authentication::Start> = decode(&secret, &mut buffer);
                    let start = packet.body();
                    recorded.lock().unwrap().push(Recorded::AuthenticationStart {
                        user: start.user_information().user().to_owned(),
                        authentication_type: start.authentication().authentication_type,
                        data: start.data().unwrap_or_default().to_vec(),
                    });
                } else {
                    let packet: Packet<authentication::Continue> = decode(&secret, &mut buffer);
                    recorded.lock().unwrap().push(Recorded::AuthenticationContinue {
                        user_message: packet.body().user_message().unwrap_or_default().to_vec(),
                    });
                }

                let status = script
                    .authentication
                    .get(authentication_step)
                    .copied()
                    .unwrap_or(authentication::Status::Error);
                authentication_step += 1;

                let flags = if status == authentication::Status::GetPassword {
                    authentication::ReplyFlags::NO_ECHO
                } else {
                    authentication::ReplyFlags::empty()
                };

                encode(
                    &secret,
                    Packet::new(
                        reply_header,
                        authentication::Reply {
                            status,
                            server_message,
                            data: &[],
                            flags,
                        },
                    )
                    .expect("reply header should be valid"),
                )
            }
            2 => {
                let packet: Packet<authorization::Request> = decode(&secret, &mut buffer);
                let request = packet.body();
                recorded.lock().unwrap().push(Recorded::Authorization {
                    user: request.user_information.user().to_owned(),
                    remote_address: request.user_information.remote_address().to_string(),
                    arguments: argument_strings(&request.arguments),
                });

                let arguments = script
                    .authorization_arguments
                    .iter()
                    .map(|(name, value, required)| {
                        tacacs_plus::protocol::Argument::new(
                            FieldText::try_from(*name).unwrap(),
                            FieldText::try_from(*value).unwrap(),
                            *required,
                        )
                        .unwrap()
                    })
                    .collect();

                encode(
                    &secret,
                    Packet::new(
                        reply_header,
                        authorization::Reply {
                            status: script.authorization,
                            server_message,
                            data: &[],
                            arguments: Arguments::new(arguments).unwrap(),
                        },
                    )
                    .expect("reply header should be valid"),
                )
            }
            3 => {
                let packet: Packet<accounting::Request> = decode(&secret, &mut buffer);
                let request = packet.body();
                recorded.lock().unwrap().push(Recorded::Accounting {
                    flags: request.flags,
                    arguments: argument_strings(&request.arguments),
                });

                encode(
                    &secret,
                    Packet::new(
                        reply_header,
                        accounting::Reply {
                            status: script.accounting,
                            server_message,
                            data: &[],
                        },
                    )
                    .expect("reply header should be valid"),
                )
            }
            other => panic!("unexpected packet type {other}"),
        };

        if stream.write_all(&reply).await.is_err() {
            return;
        }
    }
}
