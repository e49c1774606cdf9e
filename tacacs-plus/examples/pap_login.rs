use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use tacacs_plus::{AuthenticationType, Client, ConnectionFuture, ContextBuilder, ResponseStatus};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // NOTE: this assumes a TACACS+ server is already listening at TACACS_SERVER
    let server = std::env::var("TACACS_SERVER").unwrap_or(String::from("localhost:49"));
    let secret = std::env::var("TACACS_SECRET").ok();

    let client = Client::new(
        Box::new(move || -> ConnectionFuture<_> {
            let server = server.clone();

            Box::pin(async move {
                TcpStream::connect(server)
                    .await
                    // tokio has its own AsyncRead/AsyncWrite traits, so a compatibility shim is needed
                    .map(TokioAsyncWriteCompatExt::compat_write)
            })
        }),
        secret,
    );

    let context = ContextBuilder::new("someuser")
        .port("ttyS0")
        .remote_address("127.0.0.1")
        .build();

    match client
        .authenticate(&context, "hunter2", AuthenticationType::Pap)
        .await
    {
        Ok(response) if response.status == ResponseStatus::Success => {
            println!("Authentication successful!")
        }
        Ok(response) => println!("Authentication failed. Full response: {response:?}"),
        Err(error) => eprintln!("Error: {error}"),
    }
}
