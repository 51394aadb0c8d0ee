use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::vad::VadEdge;

/// Lifecycle phase of the active session. Exactly one value is live at a
/// time, superseded on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Connecting = 1,
    Listening = 2,
    UserSpeaking = 3,
    Processing = 4,
    Speaking = 5,
    Error = 6,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Listening,
            3 => SessionState::UserSpeaking,
            4 => SessionState::Processing,
            5 => SessionState::Speaking,
            6 => SessionState::Error,
            _ => SessionState::Idle,
        }
    }

    /// True while a connected conversation is in progress.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            SessionState::Listening
                | SessionState::UserSpeaking
                | SessionState::Processing
                | SessionState::Speaking
        )
    }
}

/// Shared authoritative state cell.
///
/// Audio callbacks fire asynchronously relative to the event loop, so every
/// reader must observe the value current at dispatch time, never one captured
/// when the callback was registered. Clones share the same cell.
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionState::Idle as u8)))
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Finite-state controller for the session lifecycle. Every transition is
/// evaluated against the current cell value at dispatch time.
pub struct SessionStateMachine {
    cell: StateCell,
}

impl SessionStateMachine {
    pub fn new(cell: StateCell) -> Self {
        Self { cell }
    }

    pub fn state(&self) -> SessionState {
        self.cell.get()
    }

    /// Idle → Connecting. Returns false when a session is already underway.
    pub fn begin_connecting(&self) -> bool {
        if self.cell.get() != SessionState::Idle {
            return false;
        }
        self.transition(SessionState::Connecting);
        true
    }

    /// Connecting → Listening, on the connection-established signal.
    pub fn on_connected(&self) {
        if self.cell.get() == SessionState::Connecting {
            self.transition(SessionState::Listening);
        }
    }

    /// Advisory VAD edges. Purely a UI affordance; audio transmission is
    /// never gated by these transitions.
    pub fn on_vad(&self, edge: VadEdge) {
        let current = self.cell.get();
        match edge {
            VadEdge::Rise => {
                if current.is_live() && current != SessionState::UserSpeaking {
                    self.transition(SessionState::UserSpeaking);
                }
            }
            VadEdge::Fall => {
                if current == SessionState::UserSpeaking {
                    self.transition(SessionState::Processing);
                }
            }
        }
    }

    /// First synthesized-audio or output-transcript fragment of a turn.
    pub fn on_output_fragment(&self) {
        let current = self.cell.get();
        if current.is_live() && current != SessionState::Speaking {
            self.transition(SessionState::Speaking);
        }
    }

    /// Turn-complete signal from the service.
    pub fn on_turn_complete(&self) {
        if self.cell.get().is_live() {
            self.transition(SessionState::Listening);
        }
    }

    /// Explicit stop, user-initiated or service close.
    pub fn on_stop(&self) {
        if self.cell.get() != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
    }

    /// Unrecoverable connection error.
    pub fn on_error(&self) {
        self.transition(SessionState::Error);
    }

    fn transition(&self, next: SessionState) {
        let prev = self.cell.get();
        tracing::debug!("session state: {:?} -> {:?}", prev, next);
        self.cell.set(next);
    }
}
