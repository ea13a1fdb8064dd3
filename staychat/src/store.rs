//! In-memory cache for the single open conversation.
//!
//! [`ConversationStore`] keeps the ordered, deduplicated message history
//! plus the pagination bookkeeping. All mutation goes through the merge
//! functions in [`crate::merge`], so the same guarantees hold regardless
//! of which completion (poll, pagination, send reconciliation) lands
//! first: no duplicate confirmed id, ascending `created_at`, forward-only
//! status.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use staychat_api::types::{
    ConversationKey, DeliveryStatus, Message, MessageId, TempId, UserId,
};

use crate::merge::{self, PENDING_TIEBREAK, SortKey};

/// Identity of a cached entry: confirmed by the server, or still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryId {
    /// Server-confirmed message.
    Confirmed(MessageId),
    /// Optimistic local entry awaiting its confirmed counterpart.
    Pending(TempId),
}

/// One message as cached for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Confirmed or pending identity.
    pub id: EntryId,
    /// The user who sent the message.
    pub sender: UserId,
    /// The user who received it.
    pub recipient: UserId,
    /// Plain-text body.
    pub body: String,
    /// Creation time (local clock until confirmed).
    pub created_at: DateTime<Utc>,
    /// Delivery/read progress.
    pub status: DeliveryStatus,
}

impl From<&Message> for Entry {
    fn from(msg: &Message) -> Self {
        Self {
            id: EntryId::Confirmed(msg.id),
            sender: msg.sender,
            recipient: msg.recipient,
            body: msg.body.clone(),
            created_at: msg.created_at,
            status: msg.status,
        }
    }
}

impl Entry {
    /// The confirmed server id, if this entry has one.
    #[must_use]
    pub const fn confirmed_id(&self) -> Option<MessageId> {
        match self.id {
            EntryId::Confirmed(id) => Some(id),
            EntryId::Pending(_) => None,
        }
    }

    /// Whether this entry is still awaiting server confirmation.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.id, EntryId::Pending(_))
    }

    fn sort_key(&self) -> SortKey {
        match self.id {
            EntryId::Confirmed(id) => (self.created_at, id.as_i64()),
            EntryId::Pending(_) => (self.created_at, PENDING_TIEBREAK),
        }
    }
}

/// Outcome of reconciling an optimistic entry with its server record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The pending entry was swapped for the confirmed record.
    Replaced,
    /// The confirmed record had already arrived through a poll; the
    /// pending entry was dropped so the message appears exactly once.
    DroppedDuplicate,
    /// No pending entry with that marker exists (already reconciled or
    /// rolled back).
    NotFound,
}

/// Ordered, deduplicated cache of the currently open conversation.
#[derive(Debug)]
pub struct ConversationStore {
    key: ConversationKey,
    entries: Vec<Entry>,
    known_ids: HashSet<MessageId>,
    page_cursor: u32,
    total_pages: u32,
    last_known_id: Option<MessageId>,
}

impl ConversationStore {
    /// Creates an empty store for the given conversation.
    #[must_use]
    pub fn new(key: ConversationKey) -> Self {
        Self {
            key,
            entries: Vec::new(),
            known_ids: HashSet::new(),
            page_cursor: 0,
            total_pages: 0,
            last_known_id: None,
        }
    }

    /// Clears all state and rebinds the store to a new conversation.
    pub fn reset(&mut self, key: ConversationKey) {
        self.key = key;
        self.entries.clear();
        self.known_ids.clear();
        self.page_cursor = 0;
        self.total_pages = 0;
        self.last_known_id = None;
    }

    /// The conversation this store caches.
    #[must_use]
    pub const fn key(&self) -> ConversationKey {
        self.key
    }

    /// The cached entries, ascending by creation time.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Highest confirmed id observed so far.
    #[must_use]
    pub const fn last_known_id(&self) -> Option<MessageId> {
        self.last_known_id
    }

    /// Whether the given confirmed id is already cached.
    #[must_use]
    pub fn is_known(&self, id: MessageId) -> bool {
        self.known_ids.contains(&id)
    }

    /// The last page fetched (0 = nothing fetched yet).
    #[must_use]
    pub const fn page_cursor(&self) -> u32 {
        self.page_cursor
    }

    /// Total pages the backend reported most recently.
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Whether older pages remain to be fetched.
    #[must_use]
    pub const fn has_older(&self) -> bool {
        self.page_cursor < self.total_pages
    }

    /// Records a successfully fetched page position.
    pub fn set_page_info(&mut self, cursor: u32, total_pages: u32) {
        self.page_cursor = cursor;
        self.total_pages = total_pages;
    }

    /// Updates the total page count without moving the cursor (polls see
    /// the count grow as new messages arrive).
    pub fn note_total_pages(&mut self, total_pages: u32) {
        self.total_pages = total_pages;
    }

    /// Merges a fetched batch, inserting only net-new messages at their
    /// sorted positions. Returns the applied messages in display order.
    pub fn upsert_batch(&mut self, batch: &[Message]) -> Vec<Message> {
        let fresh = merge::net_new(&self.known_ids, batch);
        for msg in &fresh {
            let entry = Entry::from(msg);
            let slot = merge::sorted_position(&self.entries, entry.sort_key(), Entry::sort_key);
            self.entries.insert(slot, entry);
            self.register_id(msg.id);
        }
        fresh
    }

    /// Appends an optimistic entry with a fresh temporary marker and
    /// status [`DeliveryStatus::Sent`]. Returns the marker and a copy of
    /// the entry for rendering.
    pub fn append_optimistic(
        &mut self,
        sender: UserId,
        recipient: UserId,
        body: String,
    ) -> (TempId, Entry) {
        let temp = TempId::new();
        let entry = Entry {
            id: EntryId::Pending(temp),
            sender,
            recipient,
            body,
            created_at: Utc::now(),
            status: DeliveryStatus::Sent,
        };
        let slot = merge::sorted_position(&self.entries, entry.sort_key(), Entry::sort_key);
        self.entries.insert(slot, entry.clone());
        (temp, entry)
    }

    /// Swaps a pending entry for its server-confirmed record.
    ///
    /// If the confirmed id already arrived through a poll in the meantime,
    /// the pending entry is simply dropped — the message must appear
    /// exactly once.
    pub fn replace_optimistic(&mut self, temp: TempId, confirmed: &Message) -> ReplaceOutcome {
        let Some(idx) = self.position_of_pending(temp) else {
            return ReplaceOutcome::NotFound;
        };
        self.entries.remove(idx);

        if self.known_ids.contains(&confirmed.id) {
            return ReplaceOutcome::DroppedDuplicate;
        }

        let entry = Entry::from(confirmed);
        let slot = merge::sorted_position(&self.entries, entry.sort_key(), Entry::sort_key);
        self.entries.insert(slot, entry);
        self.register_id(confirmed.id);
        ReplaceOutcome::Replaced
    }

    /// Removes a pending entry (send failure rollback). Returns whether
    /// anything was removed.
    pub fn remove_optimistic(&mut self, temp: TempId) -> bool {
        match self.position_of_pending(temp) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Applies a status update to a confirmed entry, enforcing the
    /// forward-only rule. Returns the new status when it was an upgrade.
    pub fn apply_status(&mut self, id: MessageId, status: DeliveryStatus) -> Option<DeliveryStatus> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.confirmed_id() == Some(id))?;
        if status > entry.status {
            entry.status = status;
            Some(status)
        } else {
            None
        }
    }

    fn position_of_pending(&self, temp: TempId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.id == EntryId::Pending(temp))
    }

    fn register_id(&mut self, id: MessageId) {
        self.known_ids.insert(id);
        if self.last_known_id.is_none_or(|highest| id > highest) {
            self.last_known_id = Some(id);
        }
    }
}
