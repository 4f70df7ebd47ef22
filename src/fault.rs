use std::fmt;
use std::time::Duration;

use crate::constants::{
    minimal_response, response_head, DELAYED_RESPONSE_BODY, HEADER_MIDDLE_FRAGMENT,
    NORMAL_RESPONSE_BODY, STATUS_LINE_FRAGMENT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultAction {
    None,
    BreakOnHeader,
    BreakOnBody,
    BreakAtResponseStart,
    BreakAtResponseMiddle,
    BreakAtResponseHeaderMiddle,
    DelayThenRespondAfterHeaderSent,
    DelayThenRespondAfterBodyPartiallySent,
}

/// URL markers in match order. The first marker contained in the URL wins.
pub const FAULT_TABLE: [(&str, FaultAction); 7] = [
    ("break-on-header", FaultAction::BreakOnHeader),
    ("break-on-body", FaultAction::BreakOnBody),
    ("break-on-res-start", FaultAction::BreakAtResponseStart),
    ("break-on-res-middle", FaultAction::BreakAtResponseMiddle),
    ("break-on-res-header-middle", FaultAction::BreakAtResponseHeaderMiddle),
    (
        "break-on-res-timeout-header",
        FaultAction::DelayThenRespondAfterHeaderSent,
    ),
    (
        "break-on-res-timeout-body",
        FaultAction::DelayThenRespondAfterBodyPartiallySent,
    ),
];

pub fn classify(url: &str) -> FaultAction {
    FAULT_TABLE
        .iter()
        .find(|(marker, _)| url.contains(marker))
        .map(|(_, action)| *action)
        .unwrap_or(FaultAction::None)
}

impl FaultAction {
    /// Actions that only fire once the whole request has been received.
    pub fn is_response_phase(self) -> bool {
        matches!(
            self,
            FaultAction::BreakAtResponseStart
                | FaultAction::BreakAtResponseMiddle
                | FaultAction::BreakAtResponseHeaderMiddle
                | FaultAction::DelayThenRespondAfterHeaderSent
                | FaultAction::DelayThenRespondAfterBodyPartiallySent
        )
    }

    /// What to put on the wire once this action's trigger has been reached.
    pub fn plan(self, delay: Duration) -> Plan {
        match self {
            FaultAction::None => Plan::new(vec![
                Step::Write(minimal_response(NORMAL_RESPONSE_BODY)),
                Step::Close,
            ]),
            FaultAction::BreakOnHeader
            | FaultAction::BreakOnBody
            | FaultAction::BreakAtResponseStart => Plan::new(vec![Step::Sever]),
            FaultAction::BreakAtResponseMiddle => Plan::new(vec![
                Step::Write(STATUS_LINE_FRAGMENT.to_vec()),
                Step::Sever,
            ]),
            FaultAction::BreakAtResponseHeaderMiddle => Plan::new(vec![
                Step::Write(HEADER_MIDDLE_FRAGMENT.to_vec()),
                Step::Sever,
            ]),
            FaultAction::DelayThenRespondAfterHeaderSent => Plan::new(vec![
                Step::Sleep(delay),
                Step::Write(minimal_response(DELAYED_RESPONSE_BODY)),
                Step::Close,
            ]),
            FaultAction::DelayThenRespondAfterBodyPartiallySent => Plan::new(vec![
                Step::Write(response_head(DELAYED_RESPONSE_BODY.len()).into_bytes()),
                Step::Sleep(delay),
                Step::Write(DELAYED_RESPONSE_BODY.as_bytes().to_vec()),
                Step::Close,
            ]),
        }
    }
}

impl fmt::Display for FaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = FAULT_TABLE
            .iter()
            .find(|(_, action)| action == self)
            .map(|(marker, _)| *marker)
            .unwrap_or("none");
        f.write_str(marker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Write(Vec<u8>),
    Sleep(Duration),
    /// Zero-linger close: unsent data is dropped and the peer sees a reset.
    Sever,
    /// Orderly shutdown.
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn severs(&self) -> bool {
        self.steps.contains(&Step::Sever)
    }
}
