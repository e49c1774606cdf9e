//! A gRPC reverse proxy for the OpenOLT agent that authenticates, authorizes and accounts
//! every call against a TACACS+ server before forwarding it.
//!
//! Each inbound call runs through the same fixed sequence, implemented once in [`Mediator`]:
//! credential extraction, authentication, authorization, accounting start, forwarding to the
//! backend agent and accounting stop. [`AaaController`] applies the fallback policy when the
//! TACACS+ server can't be reached.

pub mod aaa;
pub use aaa::{AaaConfig, AaaController, AaaError};

pub mod codec;

pub mod config;

mod context;
pub use context::{CallContext, Password};

pub mod credentials;

mod mediator;
pub use mediator::Mediator;

mod service;
pub use service::{Backend, OpenoltProxy, SERVICE_NAME};

pub mod telemetry;

/// Generated OpenOLT agent service definitions, for typed clients and agents.
///
/// The proxy itself relays messages without decoding them.
pub mod proto {
    #![allow(clippy::all, missing_docs)]

    pub mod openolt {
        tonic::include_proto!("openolt");
    }

    pub mod tech_profile {
        tonic::include_proto!("tech_profile");
    }
}
