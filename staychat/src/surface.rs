//! Rendering surface abstraction.
//!
//! The sync core never touches HTML or DOM mechanics — it publishes
//! ordered entries and status updates to a [`RenderSurface`] owned by the
//! caller. The surface also answers the one geometry question pagination
//! needs (content height) and applies the scroll correction the
//! [`PaginationController`](crate::paginate::PaginationController)
//! computes.

use staychat_api::types::{BlockState, DeliveryStatus, MessageId, TempId};

use crate::store::Entry;

/// Where the core paints. Implemented by the embedding UI layer.
pub trait RenderSurface: Send {
    /// Replace the whole visible history (conversation opened or reset).
    fn reset_history(&mut self, entries: &[Entry]);

    /// Append entries at the bottom (new messages, optimistic sends).
    fn append(&mut self, entries: &[Entry]);

    /// Prepend older entries at the top (pagination).
    fn prepend(&mut self, entries: &[Entry]);

    /// Insert one entry at `index`, counted from the top. Polls use this
    /// so a merged message lands where the store ordered it, even when a
    /// pending optimistic entry sorts after it.
    fn insert_entry(&mut self, index: usize, entry: &Entry);

    /// Swap an optimistic entry for its confirmed counterpart.
    fn replace_entry(&mut self, temp: TempId, entry: &Entry);

    /// Remove an optimistic entry (send rollback or duplicate collapse).
    fn remove_entry(&mut self, temp: TempId);

    /// Upgrade the displayed status of a confirmed message.
    fn update_status(&mut self, id: MessageId, status: DeliveryStatus);

    /// Reflect the block relationship in the composer area.
    fn set_block_state(&mut self, state: BlockState);

    /// Current scrollable content height, in surface units.
    fn content_height(&self) -> u32;

    /// Move the scroll offset down by `delta` surface units.
    fn scroll_by(&mut self, delta: u32);
}

/// In-memory [`RenderSurface`] for tests and headless use.
///
/// Models geometry as a fixed height per entry, which is enough to verify
/// the scroll-anchor arithmetic exactly.
#[derive(Debug)]
pub struct RecordingSurface {
    entries: Vec<Entry>,
    row_height: u32,
    scroll_top: u32,
    block_state: BlockState,
    status_updates: Vec<(MessageId, DeliveryStatus)>,
}

impl RecordingSurface {
    /// Creates a surface where every entry is `row_height` units tall.
    #[must_use]
    pub const fn new(row_height: u32) -> Self {
        Self {
            entries: Vec::new(),
            row_height,
            scroll_top: 0,
            block_state: BlockState::Clear,
            status_updates: Vec::new(),
        }
    }

    /// The entries as currently painted, top to bottom.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The current scroll offset.
    #[must_use]
    pub const fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    /// The block state last painted.
    #[must_use]
    pub const fn block_state(&self) -> BlockState {
        self.block_state
    }

    /// Every status update applied, in arrival order.
    #[must_use]
    pub fn status_updates(&self) -> &[(MessageId, DeliveryStatus)] {
        &self.status_updates
    }
}

impl RenderSurface for RecordingSurface {
    fn reset_history(&mut self, entries: &[Entry]) {
        self.entries = entries.to_vec();
        self.scroll_top = 0;
    }

    fn append(&mut self, entries: &[Entry]) {
        self.entries.extend_from_slice(entries);
    }

    fn prepend(&mut self, entries: &[Entry]) {
        let mut combined = entries.to_vec();
        combined.extend(self.entries.drain(..));
        self.entries = combined;
    }

    fn insert_entry(&mut self, index: usize, entry: &Entry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry.clone());
    }

    fn replace_entry(&mut self, temp: TempId, entry: &Entry) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.id == crate::store::EntryId::Pending(temp))
        {
            *existing = entry.clone();
        }
    }

    fn remove_entry(&mut self, temp: TempId) {
        self.entries
            .retain(|e| e.id != crate::store::EntryId::Pending(temp));
    }

    fn update_status(&mut self, id: MessageId, status: DeliveryStatus) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.confirmed_id() == Some(id))
        {
            entry.status = status;
        }
        self.status_updates.push((id, status));
    }

    fn set_block_state(&mut self, state: BlockState) {
        self.block_state = state;
    }

    fn content_height(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX) * self.row_height
    }

    fn scroll_by(&mut self, delta: u32) {
        self.scroll_top = self.scroll_top.saturating_add(delta);
    }
}
