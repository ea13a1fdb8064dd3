//! Optimistic send pipeline.
//!
//! [`deliver`] runs the full outgoing protocol: validate, check the block
//! gate, claim the single-send slot, paint an optimistic entry, hit the
//! backend, then reconcile or roll back. The optimistic entry is visible
//! for the entire network round trip and disappears only on failure.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use staychat_api::client::MarketplaceApi;
use staychat_api::error::ApiError;
use staychat_api::types::{BlockState, ConversationKey, Message, MessageId, UserId};

use crate::block::BlockGate;
use crate::store::{ConversationStore, ReplaceOutcome};
use crate::surface::RenderSurface;
use crate::validate::{self, RejectReason};

/// Why an outgoing message did not reach the backend.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Local validation refused the content; no network traffic happened.
    #[error(transparent)]
    Rejected(#[from] RejectReason),

    /// The block relationship forbids sending.
    #[error("sending is blocked: {0}")]
    Blocked(BlockState),

    /// A previous send is still in flight.
    #[error("a send is already in flight")]
    Busy,

    /// The backend call failed; the optimistic entry was rolled back.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Serializes outgoing sends: at most one in flight per conversation.
#[derive(Debug, Default)]
pub struct SendQueue {
    in_flight: AtomicBool,
}

impl SendQueue {
    /// Creates an idle queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a send is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<SendSlot<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(SendSlot { queue: self })
        } else {
            None
        }
    }
}

/// Holds the in-flight slot; released on drop so early returns and
/// failures cannot leave the queue stuck busy.
struct SendSlot<'a> {
    queue: &'a SendQueue,
}

impl Drop for SendSlot<'_> {
    fn drop(&mut self) {
        self.queue.in_flight.store(false, Ordering::Release);
    }
}

/// Runs one outgoing send end to end.
///
/// The store and surface locks are taken only for the synchronous merge
/// steps, never across the backend call.
pub(crate) async fn deliver<A, S>(
    queue: &SendQueue,
    api: &A,
    gate: &Mutex<BlockGate>,
    store: &Mutex<ConversationStore>,
    surface: &Mutex<S>,
    sender: UserId,
    key: ConversationKey,
    raw_body: &str,
) -> Result<MessageId, SendError>
where
    A: MarketplaceApi,
    S: RenderSurface,
{
    let body = validate::validate_outgoing(raw_body)?;
    gate.lock().permits_send().map_err(SendError::Blocked)?;
    let Some(_slot) = queue.try_acquire() else {
        return Err(SendError::Busy);
    };

    let temp = {
        let mut store = store.lock();
        let (temp, entry) = store.append_optimistic(sender, key.peer, body.clone());
        surface.lock().append(std::slice::from_ref(&entry));
        temp
    };

    match api.send_message(sender, key, &body).await {
        Ok(receipt) => {
            let confirmed = Message {
                id: receipt.id,
                sender,
                recipient: key.peer,
                body,
                created_at: receipt.created_at,
                status: receipt.status,
            };
            reconcile(store, surface, temp, &confirmed);
            Ok(receipt.id)
        }
        Err(err) => {
            rollback(store, surface, temp, &err);
            Err(SendError::Api(err))
        }
    }
}

fn reconcile<S: RenderSurface>(
    store: &Mutex<ConversationStore>,
    surface: &Mutex<S>,
    temp: staychat_api::types::TempId,
    confirmed: &Message,
) {
    let outcome = store.lock().replace_optimistic(temp, confirmed);
    match outcome {
        ReplaceOutcome::Replaced => {
            surface
                .lock()
                .replace_entry(temp, &crate::store::Entry::from(confirmed));
        }
        ReplaceOutcome::DroppedDuplicate => {
            // A poll already painted the confirmed record.
            surface.lock().remove_entry(temp);
        }
        ReplaceOutcome::NotFound => {
            tracing::warn!(id = %confirmed.id, "send confirmed but pending entry was gone");
        }
    }
}

fn rollback<S: RenderSurface>(
    store: &Mutex<ConversationStore>,
    surface: &Mutex<S>,
    temp: staychat_api::types::TempId,
    err: &ApiError,
) {
    tracing::warn!(error = %err, "send failed, rolling back optimistic entry");
    if store.lock().remove_optimistic(temp) {
        surface.lock().remove_entry(temp);
    }
}
