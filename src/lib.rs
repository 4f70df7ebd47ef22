pub mod config;
pub mod connection;
pub mod constants;
pub mod fault;
pub mod parser;
pub mod server;
pub mod session;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use config::ServerConfig;
pub use fault::{classify, FaultAction};
pub use parser::{parse, ParseOptions, ParsedRequest};
pub use session::{Mode, Session, SessionState};

/// Binds `config.addr` and serves it on a background task until `shutdown`
/// is cancelled. Bind failures are returned to the caller.
pub fn start_server(
    config: ServerConfig,
    shutdown: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    let listener = server::bind(&config)?;
    let local_addr = listener.local_addr()?;
    let handle = tokio::spawn(server::serve(listener, Arc::new(config), shutdown));
    Ok((local_addr, handle))
}
