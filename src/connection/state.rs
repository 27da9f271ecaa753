//! Handle state machine

use crate::{Error, Result};

/// Handle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Not connected yet
    Initial,

    /// Dialing hosts
    Connecting,

    /// Connected, ready for pings
    Open,

    /// Closed
    Closed,
}

impl HandleState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: HandleState) -> bool {
        use HandleState::*;

        matches!(
            (self, next),
            (Initial, Connecting) | (Connecting, Open) | (_, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: HandleState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::Connection(format!(
                "invalid handle state transition from {} to {}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }

    /// Whether pings are allowed
    pub fn is_open(&self) -> bool {
        matches!(self, HandleState::Open)
    }
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
