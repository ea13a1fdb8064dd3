//! Property-based tests for the merge invariants.
//!
//! Uses proptest to verify, for arbitrary message batches:
//! 1. Merging is idempotent: replaying a batch changes nothing.
//! 2. No confirmed id ever appears twice in the cache.
//! 3. Entries always ascend by `(created_at, id)`.
//! 4. The final cache is independent of batch arrival order.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use staychat::store::ConversationStore;
use staychat_api::types::{
    ConversationKey, DeliveryStatus, Message, MessageId, UserId,
};

// --- Strategies ---

/// Strategy for a message with a bounded id and timestamp. Small ranges
/// force plenty of duplicate ids and timestamp collisions.
fn arb_message() -> impl Strategy<Value = Message> {
    (1i64..200, 0i64..50).prop_map(|(id, at_secs)| Message {
        id: MessageId::new(id),
        sender: UserId::new(2),
        recipient: UserId::new(1),
        body: format!("body {id}"),
        created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        status: DeliveryStatus::Sent,
    })
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<Message>>> {
    prop::collection::vec(prop::collection::vec(arb_message(), 0..20), 1..6)
}

fn fresh_store() -> ConversationStore {
    ConversationStore::new(ConversationKey::general(UserId::new(2)))
}

fn confirmed_ids(store: &ConversationStore) -> Vec<i64> {
    store
        .entries()
        .iter()
        .filter_map(|e| e.confirmed_id().map(|id| id.as_i64()))
        .collect()
}

// Ids are assigned in creation order, so any two messages sharing an id
// are the same message. Deduplicate conflicting bodies before merging.
fn canonical(batches: Vec<Vec<Message>>) -> Vec<Vec<Message>> {
    use std::collections::HashMap;
    let mut seen: HashMap<MessageId, Message> = HashMap::new();
    for msg in batches.iter().flatten() {
        seen.entry(msg.id).or_insert_with(|| msg.clone());
    }
    batches
        .into_iter()
        .map(|batch| batch.into_iter().map(|m| seen[&m.id].clone()).collect())
        .collect()
}

// --- Properties ---

proptest! {
    #[test]
    fn replaying_any_batch_is_a_no_op(batches in arb_batches()) {
        let batches = canonical(batches);
        let mut store = fresh_store();
        for batch in &batches {
            store.upsert_batch(batch);
        }
        let snapshot: Vec<_> = store.entries().to_vec();

        for batch in &batches {
            let applied = store.upsert_batch(batch);
            prop_assert!(applied.is_empty());
        }
        prop_assert_eq!(store.entries(), snapshot.as_slice());
    }

    #[test]
    fn no_confirmed_id_appears_twice(batches in arb_batches()) {
        let batches = canonical(batches);
        let mut store = fresh_store();
        for batch in &batches {
            store.upsert_batch(batch);
        }

        let mut ids = confirmed_ids(&store);
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), before);
    }

    #[test]
    fn entries_always_ascend(batches in arb_batches()) {
        let batches = canonical(batches);
        let mut store = fresh_store();
        for batch in &batches {
            store.upsert_batch(batch);

            let keys: Vec<_> = store
                .entries()
                .iter()
                .map(|e| (e.created_at, e.confirmed_id().map(|id| id.as_i64())))
                .collect();
            prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn arrival_order_does_not_matter(batches in arb_batches()) {
        let batches = canonical(batches);
        let mut forward = fresh_store();
        for batch in &batches {
            forward.upsert_batch(batch);
        }

        let mut reverse = fresh_store();
        for batch in batches.iter().rev() {
            reverse.upsert_batch(batch);
        }

        prop_assert_eq!(forward.entries(), reverse.entries());
        prop_assert_eq!(forward.last_known_id(), reverse.last_known_id());
    }
}
