//! Wire format types for the marketplace messaging backend.
//!
//! All types in this module mirror the backend's HTTP/JSON payloads. The
//! sync core's client-side view types build on top of these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed message body length in characters.
pub const MAX_BODY_CHARS: usize = 2000;

/// Identifies a marketplace user (traveler or host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user identifier from a raw backend id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw backend id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a listing (stay) on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(i64);

impl ListingId {
    /// Creates a listing identifier from a raw backend id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw backend id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned message identifier.
///
/// Globally unique and monotonically increasing with creation order, so a
/// higher id always means a more recently created message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Creates a message identifier from a raw backend id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw backend id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locally generated marker for an optimistic, not-yet-confirmed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(Uuid);

impl TempId {
    /// Creates a fresh, locally unique temporary identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a conversation: the counterpart user plus an optional listing
/// context. A `None` listing denotes a general conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    /// The counterpart user.
    pub peer: UserId,
    /// The listing the conversation is about, if any.
    pub listing: Option<ListingId>,
}

impl ConversationKey {
    /// Creates a conversation key scoped to a listing.
    #[must_use]
    pub const fn for_listing(peer: UserId, listing: ListingId) -> Self {
        Self {
            peer,
            listing: Some(listing),
        }
    }

    /// Creates a general (listing-less) conversation key.
    #[must_use]
    pub const fn general(peer: UserId) -> Self {
        Self {
            peer,
            listing: None,
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.listing {
            Some(listing) => write!(f, "peer {} / listing {listing}", self.peer),
            None => write!(f, "peer {} / general", self.peer),
        }
    }
}

/// Delivery/read progress of an own sent message.
///
/// `Ord` follows the delivery lifecycle, so "never downgrade" is simply
/// `new > current`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Accepted by the backend, not yet delivered to the recipient.
    Sent,
    /// Delivered to the recipient's client.
    Delivered,
    /// Read by the recipient.
    Seen,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Delivered => write!(f, "delivered"),
            Self::Seen => write!(f, "seen"),
        }
    }
}

/// A server-confirmed message. Immutable once confirmed, except for
/// `status`, which only moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned identifier.
    pub id: MessageId,
    /// The user who sent the message.
    pub sender: UserId,
    /// The user who received it.
    pub recipient: UserId,
    /// Plain-text body.
    pub body: String,
    /// Creation time; the sole ordering key for display.
    pub created_at: DateTime<Utc>,
    /// Delivery/read progress.
    pub status: DeliveryStatus,
}

/// One page of conversation history.
///
/// Page 1 is the most recent window; higher pages are older. Messages
/// ascend by `created_at` within a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPage {
    /// The messages in this page, ascending by creation time.
    pub messages: Vec<Message>,
    /// Total number of pages currently available.
    pub total_pages: u32,
}

/// The backend's confirmation of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// The authoritative message id.
    pub id: MessageId,
    /// The authoritative creation time.
    pub created_at: DateTime<Utc>,
    /// Initial delivery status (normally [`DeliveryStatus::Sent`]).
    pub status: DeliveryStatus,
}

/// One entry of a status refresh response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// The message this status applies to.
    pub id: MessageId,
    /// Its current delivery status.
    pub status: DeliveryStatus,
}

/// Block relationship between the current user and the conversation peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Neither side has blocked the other.
    #[default]
    Clear,
    /// The current user blocked the peer (can inspect and unblock).
    BlockedByMe,
    /// The peer blocked the current user.
    BlockedByPeer,
}

impl BlockState {
    /// Whether sending is currently permitted.
    #[must_use]
    pub const fn permits_send(&self) -> bool {
        matches!(self, Self::Clear)
    }
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => write!(f, "not blocked"),
            Self::BlockedByMe => write!(f, "blocked by me"),
            Self::BlockedByPeer => write!(f, "blocked by peer"),
        }
    }
}
