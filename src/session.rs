//! Per-connection decision logic, free of any socket I/O.
//!
//! A [`Session`] owns the connection buffer. Each read is appended and the
//! whole buffer is re-parsed; once the request line is known the fault action
//! is chosen and cached. The session answers with a [`Plan`] as soon as the
//! action's trigger milestone is reached.

use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

use crate::fault::{self, FaultAction, Plan};
use crate::parser::{self, ParseOptions, ParsedRequest};

/// Which handler a listener hands out for each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Classify the URL and inject the matching fault.
    Break,
    /// Ignore the URL and always answer with the minimal `200 OK`.
    Normal,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Break => f.write_str("break"),
            Mode::Normal => f.write_str("normal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingData,
    Classifying,
    Normal,
    Faulted,
    Closed,
}

#[derive(Debug)]
pub struct Session {
    mode: Mode,
    options: ParseOptions,
    response_delay: Duration,
    buffer: Vec<u8>,
    action: Option<FaultAction>,
    state: SessionState,
}

impl Session {
    pub fn new(mode: Mode, options: ParseOptions, response_delay: Duration) -> Self {
        Self {
            mode,
            options,
            response_delay,
            buffer: Vec::new(),
            action: None,
            state: SessionState::AwaitingData,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn action(&self) -> Option<FaultAction> {
        self.action
    }

    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            SessionState::Normal | SessionState::Faulted | SessionState::Closed
        )
    }

    /// Feed newly read bytes. Returns a plan once the connection should stop
    /// reading and act.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Option<Plan> {
        if self.is_finished() {
            return None;
        }
        self.buffer.extend_from_slice(bytes);
        let request = parser::parse(&self.buffer, &self.options);
        trace!(?request, buffered = self.buffer.len(), "re-parsed request");
        self.advance(&request, false)
    }

    /// The peer closed its write side.
    ///
    /// A request whose headers are complete but which carries no
    /// `Content-Length` is considered fully received at this point.
    pub fn on_eof(&mut self) -> Option<Plan> {
        if self.is_finished() {
            return None;
        }
        let request = parser::parse(&self.buffer, &self.options);
        let plan = self.advance(&request, true);
        if plan.is_none() {
            self.state = SessionState::Closed;
        }
        plan
    }

    fn advance(&mut self, request: &ParsedRequest, eof: bool) -> Option<Plan> {
        if !request.url_recognized {
            return None;
        }

        let action = self.classify_once(request);

        let complete = request.request_complete
            || (eof && request.headers_complete && !request.has_content_length());

        let triggered = match action {
            FaultAction::BreakOnHeader => {
                request.headers_complete && !request.headers.is_empty()
            }
            FaultAction::BreakOnBody => request.body_started && !request.body.is_empty(),
            _ => complete,
        };
        if !triggered {
            return None;
        }

        self.state = match action {
            FaultAction::None => SessionState::Normal,
            _ => SessionState::Faulted,
        };
        debug!(
            mode = %self.mode,
            url = %request.url,
            %action,
            body_len = request.body.len(),
            "request reached trigger"
        );
        Some(action.plan(self.response_delay))
    }

    // The URL token is whitespace-terminated once recognized, so later reads
    // cannot change it.
    fn classify_once(&mut self, request: &ParsedRequest) -> FaultAction {
        if let Some(action) = self.action {
            return action;
        }
        let action = match self.mode {
            Mode::Break => fault::classify(&request.url),
            Mode::Normal => FaultAction::None,
        };
        debug!(
            mode = %self.mode,
            method = request.method.as_deref().unwrap_or(""),
            url = %request.url,
            version = ?request.http_version(),
            %action,
            response_phase = action.is_response_phase(),
            "classified request"
        );
        self.action = Some(action);
        self.state = SessionState::Classifying;
        action
    }
}
