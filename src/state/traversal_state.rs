/// Traversal state definitions for one run over a chain
///
/// This module defines the states the engine moves through while following a
/// chain, and which moves between them are legal.
use std::fmt;

/// Represents the current state of a chain traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalState {
    // ===== Active States =====
    /// Run created; cursor loaded from the progress store
    Idle,

    /// Fetching the page under the cursor
    Fetching,

    /// Writing the fetched page to the output location
    Saving,

    /// Looking for the next link and persisting the advanced cursor
    Advancing,

    // ===== Terminal States =====
    /// Chain ended (no next link or a cycle); progress record removed
    Done,

    /// The run failed; progress record left for a later resume
    Aborted,
}

impl TraversalState {
    /// Returns true if this is a terminal state (the run is over)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if the run is still in progress
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// ```text
    /// Idle -> Fetching -> Saving -> Advancing -> Fetching ...
    ///   |        |                     |
    ///   +-> Done +-> Done              +-> Done
    /// ```
    ///
    /// `Idle -> Done` covers a stored record whose chain already finished;
    /// `Fetching -> Done` covers a cursor that was already visited. Any
    /// active state may move to `Aborted`.
    pub fn can_transition_to(&self, next: TraversalState) -> bool {
        use TraversalState::*;

        if next == Aborted {
            return self.is_active();
        }

        matches!(
            (self, next),
            (Idle, Fetching)
                | (Idle, Done)
                | (Fetching, Saving)
                | (Fetching, Done)
                | (Saving, Advancing)
                | (Advancing, Fetching)
                | (Advancing, Done)
        )
    }

    /// Returns the lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Saving => "saving",
            Self::Advancing => "advancing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Returns all possible traversal states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Fetching,
            Self::Saving,
            Self::Advancing,
            Self::Done,
            Self::Aborted,
        ]
    }
}

impl fmt::Display for TraversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
