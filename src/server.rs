use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection;

const LISTEN_BACKLOG: u32 = 1024;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Binds the listening socket with the configured tiny receive buffer.
pub fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let socket = if config.addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("Failed to create socket")?;

    socket
        .set_reuseaddr(true)
        .context("Failed to set SO_REUSEADDR")?;
    socket
        .set_recv_buffer_size(config.recv_buffer_size)
        .context("Failed to set SO_RCVBUF")?;
    socket
        .bind(config.addr)
        .with_context(|| format!("Failed to bind {}", config.addr))?;

    let listener = socket
        .listen(LISTEN_BACKLOG)
        .with_context(|| format!("Failed to listen on {}", config.addr))?;
    Ok(listener)
}

/// Accepts connections until `shutdown` is cancelled, one task per connection.
///
/// After shutdown, in-flight connections get `drain_timeout` to finish before
/// they are dropped.
pub async fn serve(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(
        "{} server listening on {} (SO_RCVBUF={})",
        config.mode, local_addr, config.recv_buffer_size
    );

    let tracker = TaskTracker::new();
    let force_close = CancellationToken::new();

    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept on {}: {}", local_addr, e);
                if accept_backoff(&shutdown).await {
                    continue;
                }
                break;
            }
        };

        let session = config.new_session();
        let read_chunk_size = config.read_chunk_size;
        let force_close = force_close.clone();

        tracker.spawn(async move {
            debug!("Connection from {}", peer_addr);
            tokio::select! {
                result = connection::handle_connection(stream, session, read_chunk_size) => {
                    if let Err(e) = result {
                        warn!("Error handling {}: {:#}", peer_addr, e);
                    }
                }
                () = force_close.cancelled() => {
                    debug!("Force-closing {}", peer_addr);
                }
            }
            debug!("Connection closed: {}", peer_addr);
        });
    }

    drop(listener);
    tracker.close();
    info!(
        "{} server on {} stopped accepting, {} connection(s) in flight",
        config.mode,
        local_addr,
        tracker.len()
    );

    if tokio::time::timeout(config.drain_timeout, tracker.wait())
        .await
        .is_err()
    {
        warn!(
            "Drain timeout elapsed, force-closing {} connection(s)",
            tracker.len()
        );
        force_close.cancel();
        tracker.wait().await;
    }

    Ok(())
}

/// Pauses after a failed accept so errors such as EMFILE do not spin the loop.
/// Returns `false` if shutdown was requested while waiting.
async fn accept_backoff(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
    }
}
