//! Pure merge functions for conversation batches.
//!
//! A fetched batch may overlap the cache arbitrarily (polls re-fetch the
//! recent window, pagination re-fetches boundary messages). These
//! functions compute the net-new subset and its ordered placement so that
//! merging is idempotent and commutative with respect to already-known
//! ids, in linear time over the combined size.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use staychat_api::types::{Message, MessageId};

/// Ordering key for a cached entry: creation time, then server id.
///
/// Pending (optimistic) entries use [`PENDING_TIEBREAK`] so they sort
/// after any confirmed message with the same timestamp.
pub type SortKey = (DateTime<Utc>, i64);

/// Id tiebreak used for entries that have no server id yet.
pub const PENDING_TIEBREAK: i64 = i64::MAX;

/// Returns the subset of `batch` whose ids are not in `known`, sorted
/// ascending by `created_at` (server id as tiebreak).
///
/// Ids seen twice within `batch` itself are also collapsed to the first
/// occurrence.
#[must_use]
pub fn net_new(known: &HashSet<MessageId>, batch: &[Message]) -> Vec<Message> {
    let mut seen_in_batch = HashSet::new();
    let mut fresh: Vec<Message> = batch
        .iter()
        .filter(|msg| !known.contains(&msg.id) && seen_in_batch.insert(msg.id))
        .cloned()
        .collect();
    fresh.sort_by_key(|m| (m.created_at, m.id));
    fresh
}

/// Index at which an entry with `key` keeps the sequence ascending,
/// where `key_of` extracts each existing entry's key.
///
/// Equal keys insert after existing entries, so repeated merges never
/// reorder what is already placed.
pub fn sorted_position<T>(ordered: &[T], key: SortKey, key_of: impl Fn(&T) -> SortKey) -> usize {
    ordered.partition_point(|existing| key_of(existing) <= key)
}

/// The [`SortKey`] of a confirmed server message.
#[must_use]
pub fn message_key(msg: &Message) -> SortKey {
    (msg.created_at, msg.id.as_i64())
}
