use std::net::SocketAddr;
use std::time::Duration;

use crate::constants;
use crate::parser::ParseOptions;
use crate::session::{Mode, Session};

/// Settings for one listener, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// `SO_RCVBUF` for the listening socket, inherited by accepted sockets.
    pub recv_buffer_size: u32,
    pub mode: Mode,
    pub read_chunk_size: usize,
    pub response_delay: Duration,
    pub parse: ParseOptions,
    /// How long in-flight connections may run after shutdown before they are
    /// force-closed.
    pub drain_timeout: Duration,
}

impl ServerConfig {
    pub fn new(addr: SocketAddr, mode: Mode) -> Self {
        Self {
            addr,
            recv_buffer_size: constants::DEFAULT_RECV_BUFFER_SIZE,
            mode,
            read_chunk_size: constants::DEFAULT_READ_CHUNK_SIZE,
            response_delay: constants::DEFAULT_RESPONSE_DELAY,
            parse: ParseOptions::default(),
            drain_timeout: constants::DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_recv_buffer_size(mut self, size: u32) -> Self {
        self.recv_buffer_size = size;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Fresh handler state for one accepted connection.
    pub fn new_session(&self) -> Session {
        Session::new(self.mode, self.parse, self.response_delay)
    }
}
