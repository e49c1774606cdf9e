//! A scripted TACACS+ server that records every request it receives.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tacacs_plus::protocol::{accounting, authentication, authorization};
use tacacs_plus::protocol::{
    Arguments, Deserialize, FieldText, HeaderInfo, Packet, PacketBody, PacketFlags, Serialize,
    Version,
};

pub const SECRET: &str = "olt proxy test key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    AuthenticationStart {
        user: String,
        port: String,
        remote_address: String,
        data: Vec<u8>,
    },
    AuthenticationContinue {
        user_message: Vec<u8>,
    },
    Authorization {
        user: String,
        arguments: Vec<String>,
    },
    Accounting {
        flags: accounting::Flags,
        arguments: Vec<String>,
    },
}

impl Record {
    /// Looks up a `name=value` argument of an authorization or accounting record.
    pub fn argument(&self, name: &str) -> Option<&str> {
        let arguments = match self {
            Self::Authorization { arguments, .. } | Self::Accounting { arguments, .. } => arguments,
            _ => return None,
        };

        arguments
            .iter()
            .find_map(|argument| argument.strip_prefix(name)?.strip_prefix('='))
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    pub authentication: Vec<authentication::Status>,
    pub authorization: authorization::Status,
    pub accounting: accounting::Status,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            authentication: vec![authentication::Status::Pass],
            authorization: authorization::Status::PassAdd,
            accounting: accounting::Status::Success,
        }
    }
}

pub struct TacacsServer {
    pub address: SocketAddr,
    records: Arc<Mutex<Vec<Record>>>,
    connections: Arc<AtomicUsize>,
}

impl TacacsServer {
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let records = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let server_records = records.clone();
        let server_connections = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                server_connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, script.clone(), server_records.clone()));
            }
        });

        Self {
            address,
            records,
            connections,
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn accounting_records(&self) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|record| matches!(record, Record::Accounting { .. }))
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn decode<'raw, B: PacketBody + Deserialize<'raw>>(buffer: &'raw mut [u8]) -> Packet<B> {
    Packet::deserialize(SECRET.as_bytes(), buffer).unwrap()
}

fn encode<B: PacketBody + Serialize>(header: HeaderInfo, body: B) -> Vec<u8> {
    let packet = Packet::new(header, body).unwrap();
    let mut buffer = vec![0; packet.wire_size()];
    packet.serialize(SECRET.as_bytes(), &mut buffer).unwrap();
    buffer
}

fn argument_strings(arguments: &Arguments<'_>) -> Vec<String> {
    arguments.iter().map(ToString::to_string).collect()
}

async fn serve(mut stream: TcpStream, script: Script, records: Arc<Mutex<Vec<Record>>>) {
    let mut authentication_replies = script.authentication.iter().copied();

    loop {
        let mut buffer = vec![0u8; HeaderInfo::HEADER_SIZE_BYTES];
        if stream.read_exact(&mut buffer).await.is_err() {
            return;
        }

        let length = u32::from_be_bytes([buffer[8], buffer[9], buffer[10], buffer[11]]) as usize;
        buffer.resize(HeaderInfo::HEADER_SIZE_BYTES + length, 0);
        if stream
            .read_exact(&mut buffer[HeaderInfo::HEADER_SIZE_BYTES..])
            .await
            .is_err()
        {
            return;
        }

        let sequence_number = buffer[2];
        let reply_header = HeaderInfo::new(
            Version::try_from(buffer[0]).unwrap(),
            sequence_number + 1,
            PacketFlags::empty(),
            u32::from_be_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]),
        );

        let reply = match buffer[1] {
            1 => {
                let record = if sequence_number == 1 {
                    let packet: Packet<authentication::Start> = decode(&mut buffer);
                    let start = packet.body();
                    Record::AuthenticationStart {
                        user: start.user_information().user().to_owned(),
                        port: start.user_information().port().to_string(),
                        remote_address: start.user_information().remote_address().to_string(),
                        data: start.data().unwrap_or_default().to_vec(),
                    }
                } else {
                    let packet: Packet<authentication::Continue> = decode(&mut buffer);
                    Record::AuthenticationContinue {
                        user_message: packet.body().user_message().unwrap_or_default().to_vec(),
                    }
                };
                records.lock().unwrap().push(record);

                encode(
                    reply_header,
                    authentication::Reply {
                        status: authentication_replies
                            .next()
                            .unwrap_or(authentication::Status::Error),
                        server_message: FieldText::default(),
                        data: &[],
                        flags: authentication::ReplyFlags::empty(),
                    },
                )
            }
            2 => {
                let packet: Packet<authorization::Request> = decode(&mut buffer);
                let request = packet.body();
                records.lock().unwrap().push(Record::Authorization {
                    user: request.user_information.user().to_owned(),
                    arguments: argument_strings(&request.arguments),
                });

                encode(
                    reply_header,
                    authorization::Reply {
                        status: script.authorization,
                        server_message: FieldText::default(),
                        data: &[],
                        arguments: Arguments::default(),
                    },
                )
            }
            3 => {
                let packet: Packet<accounting::Request> = decode(&mut buffer);
                let request = packet.body();
                records.lock().unwrap().push(Record::Accounting {
                    flags: request.flags,
                    arguments: argument_strings(&request.arguments),
                });

                encode(
                    reply_header,
                    accounting::Reply {
                        status: script.accounting,
                        server_message: FieldText::default(),
                        data: &[],
                    },
                )
            }
            other => panic!("unexpected packet type {other}"),
        };

        if stream.write_all(&reply).await.is_err() {
            return;
        }
    }
}
