//! LTO-CM session state machine.
//!
//! The tag moves INIT -> PRESELECT on REQUEST STANDARD and
//! PRESELECT -> COMMAND on an acknowledged SELECT. The host mirrors that
//! here and refuses to send a command the tag would not accept.

use std::fmt;

use crate::error::{LtoCmError, Result};
use crate::protocol::Operation;

/// Host-side view of the tag state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Before wake-up; only the REQUEST STANDARD bit frame is allowed.
    #[default]
    Init,
    /// Woken up, not selected.
    Preselect,
    /// Selected; block reads are allowed.
    Command,
    /// A step failed. Terminal.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Init => write!(f, "INIT"),
            SessionState::Preselect => write!(f, "PRESELECT"),
            SessionState::Command => write!(f, "COMMAND"),
            SessionState::Failed => write!(f, "FAILED"),
        }
    }
}

impl SessionState {
    /// Whether `op` may be sent in this state.
    pub fn allows(&self, op: Operation) -> bool {
        match self {
            SessionState::Init => op == Operation::RequestStandard,
            SessionState::Preselect => {
                matches!(op, Operation::RequestSerial | Operation::Select)
            }
            SessionState::Command => matches!(
                op,
                Operation::ReadBlock | Operation::ReadBlockExtended | Operation::ReadBlockContinue
            ),
            SessionState::Failed => false,
        }
    }
}

/// Runtime state of one session.
#[derive(Debug, Default)]
pub struct SessionContext {
    /// Current tag state.
    pub state: SessionState,
    /// Block whose first half was just read and whose second half may be
    /// fetched with READ BLOCK CONTINUE.
    pub pending_continue: Option<u16>,
    /// Blocks written to the sink so far.
    pub blocks_done: u16,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition to a new state.
    pub fn goto_state(&mut self, new_state: SessionState) {
        tracing::info!(from = %self.state, to = %new_state, "State transition");
        self.state = new_state;
    }

    pub fn fail(&mut self) {
        self.pending_continue = None;
        if self.state != SessionState::Failed {
            self.goto_state(SessionState::Failed);
        }
    }

    /// Check that `op` may be issued now.
    ///
    /// READ BLOCK CONTINUE additionally needs the block it continues.
    pub fn check(&self, op: Operation) -> Result<()> {
        let continuation_ok = op != Operation::ReadBlockContinue || self.pending_continue.is_some();
        if self.state.allows(op) && continuation_ok {
            Ok(())
        } else {
            Err(LtoCmError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == SessionState::Failed
    }
}
