use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tonic::transport::{Endpoint, Server};
use tracing::{info, warn};

use tacacs_auth_proxy::config::Args;
use tacacs_auth_proxy::{telemetry, AaaController, Backend, Mediator, OpenoltProxy};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(args.log_format)?;

    let backend_uri = args.backend_uri();
    // connects on first use, so the proxy can come up before the agent does
    let channel = Endpoint::from_shared(backend_uri.clone())
        .with_context(|| format!("invalid backend address {backend_uri:?}"))?
        .connect_lazy();

    let aaa = AaaController::new(args.aaa_config());
    match &aaa.config().server_address {
        Some(server) => info!(
            server = %server,
            fallback_pass = aaa.config().fallback_pass,
            obfuscated = aaa.config().secret.is_some(),
            "TACACS+ AAA enabled"
        ),
        None => warn!("no TACACS+ server configured, serving all calls without AAA"),
    }

    let proxy = OpenoltProxy::new(Mediator::new(Arc::new(aaa), Backend::new(channel)));

    info!(listen = %args.listen, backend = %backend_uri, "starting proxy");
    Server::builder()
        .add_service(proxy)
        .serve_with_shutdown(args.listen, shutdown_signal())
        .await
        .context("gRPC server failed")?;

    info!("proxy stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
