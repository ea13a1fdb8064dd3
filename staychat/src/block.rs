//! Block relationship gating for the composer.
//!
//! [`BlockGate`] holds the last observed [`BlockState`] between the two
//! participants and answers the two questions the UI needs: may a send
//! proceed, and what should the composer look like. The state is
//! refreshed from the backend every time a conversation is (re)activated
//! — it is never trusted across sessions.

use staychat_api::types::BlockState;

/// What the composer area should offer, given the block relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerMode {
    /// Normal composition is available.
    Compose,
    /// The current user is the blocker: composition is disabled, but the
    /// conversation can be inspected and the peer unblocked.
    InspectOrUnblock,
    /// The peer blocked the current user: composition is disabled and
    /// only a neutral "blocked" indicator is shown.
    BlockedNotice,
}

/// Tracks the block relationship for the active conversation.
#[derive(Debug, Default)]
pub struct BlockGate {
    state: BlockState,
}

impl BlockGate {
    /// Creates a gate in the unblocked state. The session refreshes it
    /// from the backend before the first send is possible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last observed block state.
    #[must_use]
    pub const fn state(&self) -> BlockState {
        self.state
    }

    /// Records a freshly observed state.
    pub fn set_state(&mut self, state: BlockState) {
        if state != self.state {
            tracing::info!(from = %self.state, to = %state, "block state changed");
        }
        self.state = state;
    }

    /// Checks whether a send may proceed. Returns the blocking state on
    /// refusal so the caller can report who blocked whom.
    ///
    /// # Errors
    ///
    /// Returns the current [`BlockState`] when it is anything other than
    /// [`BlockState::Clear`].
    pub const fn permits_send(&self) -> Result<(), BlockState> {
        if self.state.permits_send() {
            Ok(())
        } else {
            Err(self.state)
        }
    }

    /// The composer affordance matching the current state.
    #[must_use]
    pub const fn composer_mode(&self) -> ComposerMode {
        match self.state {
            BlockState::Clear => ComposerMode::Compose,
            BlockState::BlockedByMe => ComposerMode::InspectOrUnblock,
            BlockState::BlockedByPeer => ComposerMode::BlockedNotice,
        }
    }
}
