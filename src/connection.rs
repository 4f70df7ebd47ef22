use anyhow::{Context, Result};
use std::{io, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, warn};

use crate::fault::{Plan, Step};
use crate::session::Session;

/// Drives one accepted connection until its session decides, then carries out
/// the decision.
pub async fn handle_connection(
    mut stream: TcpStream,
    mut session: Session,
    read_chunk_size: usize,
) -> Result<()> {
    let mut chunk = vec![0u8; read_chunk_size.max(1)];

    let plan = loop {
        match stream.read(&mut chunk).await {
            Ok(0) => {
                debug!("Peer closed its side");
                match session.on_eof() {
                    Some(plan) => break plan,
                    None => return Ok(()),
                }
            }
            Ok(n) => {
                if let Some(plan) = session.on_bytes(&chunk[..n]) {
                    break plan;
                }
            }
            Err(e) if is_would_block(&e) => continue,
            Err(e) => return Err(e).context("Failed to read from peer"),
        }
    };

    execute_plan(stream, plan).await
}

pub async fn execute_plan(mut stream: TcpStream, plan: Plan) -> Result<()> {
    for step in plan.into_steps() {
        match step {
            Step::Write(bytes) => {
                if let Err(e) = write_flush(&mut stream, &bytes).await {
                    if is_peer_gone(&e) {
                        debug!("Peer gone before write completed: {}", e);
                        return Ok(());
                    }
                    return Err(e).context("Failed to write to peer");
                }
            }
            Step::Sleep(delay) => {
                debug!("Stalling for {:?}", delay);
                tokio::time::sleep(delay).await;
            }
            Step::Sever => {
                debug!("Severing connection");
                return sever(stream).context("Failed to reset connection");
            }
            Step::Close => {
                if let Err(e) = stream.shutdown().await {
                    if !is_peer_gone(&e) {
                        warn!("Error shutting down connection: {}", e);
                    }
                }
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Closes with `SO_LINGER` set to zero so that the kernel drops unsent data
/// and answers with RST instead of FIN.
pub fn sever(stream: TcpStream) -> io::Result<()> {
    socket2::SockRef::from(&stream).set_linger(Some(Duration::ZERO))?;
    drop(stream);
    Ok(())
}

async fn write_flush(stream: &mut TcpStream, bytes: &[u8]) -> io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await
}

fn is_would_block(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn is_peer_gone(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
