//! Backward ("load older") pagination state machine.
//!
//! [`PaginationController`] guards the at-most-one-in-flight rule and the
//! page arithmetic; [`ScrollAnchor`] computes the scroll correction that
//! keeps the viewport visually stable after older content is prepended.
//! Network I/O and store mutation stay in the session — this module is
//! pure state so the guard and anchor math are unit-testable.

/// Phase of the backward pagination state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    /// No older-page request in flight.
    Idle,
    /// An older-page request is in flight; further triggers are dropped.
    LoadingOlder,
}

/// Drives "load older" fetches: `Idle → LoadingOlder → Idle`.
#[derive(Debug)]
pub struct PaginationController {
    state: PageState,
}

impl PaginationController {
    /// Creates an idle controller.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PageState::Idle,
        }
    }

    /// Whether an older-page request is currently in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, PageState::LoadingOlder)
    }

    /// Attempts to start a "load older" cycle.
    ///
    /// Returns the page number to fetch when the controller is idle and
    /// older pages remain (`cursor < total_pages`); otherwise `None`.
    /// Rapid scroll events while loading therefore produce exactly one
    /// network call.
    pub fn begin(&mut self, cursor: u32, total_pages: u32) -> Option<u32> {
        if self.is_loading() || cursor >= total_pages {
            return None;
        }
        self.state = PageState::LoadingOlder;
        Some(cursor + 1)
    }

    /// Returns the controller to idle after the in-flight cycle resolves,
    /// successfully or not. A failed cycle leaves the cursor untouched so
    /// the same page can be retried.
    pub fn finish(&mut self) {
        self.state = PageState::Idle;
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new()
    }
}

/// Captured scroll height from before a prepend, used to compute the
/// offset correction afterwards.
#[derive(Debug, Clone, Copy)]
pub struct ScrollAnchor {
    height_before: u32,
}

impl ScrollAnchor {
    /// Records the rendering surface's content height before prepending.
    #[must_use]
    pub const fn capture(height_before: u32) -> Self {
        Self { height_before }
    }

    /// The scroll offset delta that keeps the previously visible content
    /// in place: exactly the height introduced by the prepended content.
    #[must_use]
    pub const fn adjustment(&self, height_after: u32) -> u32 {
        height_after.saturating_sub(self.height_before)
    }
}
