//! In-memory world state for the sandbox backend.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use staychat_api::types::{
    BlockState, DeliveryStatus, ListingId, Message, MessageId, UserId,
};

/// Shared sandbox state: a flat message log plus block relationships.
pub struct SandboxState {
    messages: Mutex<Vec<StoredMessage>>,
    blocks: Mutex<HashSet<(UserId, UserId)>>,
    next_id: AtomicI64,
    /// Bearer token the primary routes require. `None` disables the
    /// authentication check entirely.
    pub auth_token: Option<String>,
}

/// One message plus the listing scope it was sent under.
#[derive(Debug, Clone)]
struct StoredMessage {
    message: Message,
    listing: Option<ListingId>,
}

impl SandboxState {
    /// Creates an empty world.
    #[must_use]
    pub fn new(auth_token: Option<String>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            blocks: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(1),
            auth_token,
        }
    }

    /// Inserts a message into the log, assigning the next id.
    pub fn insert_message(
        &self,
        sender: UserId,
        recipient: UserId,
        listing: Option<ListingId>,
        body: String,
    ) -> Message {
        let message = Message {
            id: MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            sender,
            recipient,
            body,
            created_at: Utc::now(),
            status: DeliveryStatus::Sent,
        };
        self.messages.lock().push(StoredMessage {
            message: message.clone(),
            listing,
        });
        message
    }

    /// One page of the conversation, newest page first. Page 1 holds the
    /// most recent `per_page` messages; messages within a page ascend by
    /// creation time.
    ///
    /// Fetching as a participant upgrades messages addressed to them from
    /// `Sent` to `Delivered` — the sandbox treats a fetch as delivery.
    pub fn page(
        &self,
        self_id: UserId,
        peer: UserId,
        listing: Option<ListingId>,
        page: u32,
        per_page: u32,
    ) -> (Vec<Message>, u32) {
        let mut log = self.messages.lock();
        for stored in log.iter_mut() {
            if stored.listing == listing
                && stored.message.sender == peer
                && stored.message.recipient == self_id
                && stored.message.status == DeliveryStatus::Sent
            {
                stored.message.status = DeliveryStatus::Delivered;
            }
        }

        let conversation: Vec<&StoredMessage> = log
            .iter()
            .filter(|s| s.listing == listing && is_between(&s.message, self_id, peer))
            .collect();

        let per = per_page.max(1) as usize;
        let total_pages = u32::try_from(conversation.len().div_ceil(per)).unwrap_or(0);
        let end = conversation
            .len()
            .saturating_sub(per * (page.saturating_sub(1)) as usize);
        let start = end.saturating_sub(per);
        let messages = conversation[start..end]
            .iter()
            .map(|s| s.message.clone())
            .collect();
        (messages, total_pages)
    }

    /// Marks every message `peer` sent to `self_id` as seen.
    pub fn mark_seen(&self, self_id: UserId, peer: UserId) {
        let mut log = self.messages.lock();
        for stored in log.iter_mut() {
            if stored.message.sender == peer && stored.message.recipient == self_id {
                stored.message.status = DeliveryStatus::Seen;
            }
        }
    }

    /// Current statuses of the messages `self_id` sent to `peer`.
    pub fn statuses(&self, self_id: UserId, peer: UserId) -> Vec<(MessageId, DeliveryStatus)> {
        self.messages
            .lock()
            .iter()
            .filter(|s| s.message.sender == self_id && s.message.recipient == peer)
            .map(|s| (s.message.id, s.message.status))
            .collect()
    }

    /// The block relationship as seen from `self_id`.
    pub fn block_state(&self, self_id: UserId, peer: UserId) -> BlockState {
        let blocks = self.blocks.lock();
        if blocks.contains(&(self_id, peer)) {
            BlockState::BlockedByMe
        } else if blocks.contains(&(peer, self_id)) {
            BlockState::BlockedByPeer
        } else {
            BlockState::Clear
        }
    }

    /// Records a block placed by `self_id` on `peer`.
    pub fn block(&self, self_id: UserId, peer: UserId) -> BlockState {
        self.blocks.lock().insert((self_id, peer));
        self.block_state(self_id, peer)
    }

    /// Removes a block `self_id` placed on `peer`, if any.
    pub fn unblock(&self, self_id: UserId, peer: UserId) -> BlockState {
        self.blocks.lock().remove(&(self_id, peer));
        self.block_state(self_id, peer)
    }

    /// Whether a message with this id exists (report validation).
    #[must_use]
    pub fn knows_message(&self, id: MessageId) -> bool {
        self.messages.lock().iter().any(|s| s.message.id == id)
    }
}

fn is_between(message: &Message, a: UserId, b: UserId) -> bool {
    (message.sender == a && message.recipient == b)
        || (message.sender == b && message.recipient == a)
}
