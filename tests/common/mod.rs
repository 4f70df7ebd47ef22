use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rupture::{Mode, ServerConfig};

#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<anyhow::Result<()>>,
}

/// Base config on an ephemeral loopback port.
pub fn config(mode: Mode) -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap(), mode)
}

/// Spawn a server through the same `start_server` path as `main.rs`.
pub fn start(config: ServerConfig) -> TestServer {
    let shutdown = CancellationToken::new();
    let (addr, handle) = rupture::start_server(config, shutdown.clone()).unwrap();
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

#[allow(dead_code)]
pub fn start_break_server() -> TestServer {
    start(config(Mode::Break))
}

/// Everything the server sent before the connection ended, and how it ended:
/// `None` for an orderly EOF, the error kind otherwise.
#[derive(Debug)]
pub struct Outcome {
    pub received: Vec<u8>,
    pub error: Option<io::ErrorKind>,
}

impl Outcome {
    #[allow(dead_code)]
    pub fn was_reset(&self) -> bool {
        self.error == Some(io::ErrorKind::ConnectionReset)
    }
}

/// Read until EOF or error, keeping whatever arrived first.
pub async fn read_until_closed(stream: &mut TcpStream) -> Outcome {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => return None,
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(e) => return Some(e.kind()),
            }
        }
    })
    .await
    .expect("Timed out waiting for the server to close");

    Outcome {
        received,
        error: result,
    }
}

/// Send raw bytes without closing the write half, then read until the server
/// ends the connection.
#[allow(dead_code)]
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Outcome {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    read_until_closed(&mut stream).await
}

/// Send raw bytes, shut down the write half, and read the full response.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("Timed out reading response")
        .expect("Failed to read response");

    String::from_utf8_lossy(&response).into_owned()
}
