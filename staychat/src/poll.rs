//! Background timers for the active conversation.
//!
//! Two independent cadences: a message poll that probes for new arrivals
//! and merges a fresh newest window when the probe sees one, and a status
//! refresh that reports the viewer's presence and pulls delivery/read
//! upgrades. Transient backend errors are logged and the tick skipped;
//! the timers never die on their own.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use staychat_api::client::MarketplaceApi;
use tokio::task::JoinHandle;

use crate::session::SessionInner;
use crate::store::Entry;
use crate::surface::RenderSurface;

/// Handles for the per-session background tasks. Aborted on drop so a
/// closed session stops generating traffic immediately.
pub(crate) struct SessionTimers {
    poll: JoinHandle<()>,
    status: JoinHandle<()>,
}

impl SessionTimers {
    pub(crate) fn spawn<A, S>(inner: Arc<SessionInner<A, S>>) -> Self
    where
        A: MarketplaceApi + Send + Sync + 'static,
        S: RenderSurface + 'static,
    {
        let poll_inner = Arc::clone(&inner);
        let poll = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_inner.config.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick is immediate; the open() fetch covered it
            loop {
                ticker.tick().await;
                poll_tick(&poll_inner).await;
            }
        });

        let status_inner = inner;
        let status = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(status_inner.config.status_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                status_tick(&status_inner).await;
            }
        });

        Self { poll, status }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.poll.abort();
        self.status.abort();
    }
}

/// One message-poll cycle: cheap probe first, full newest window only
/// when the probe saw an id the store doesn't know yet.
pub(crate) async fn poll_tick<A, S>(inner: &SessionInner<A, S>)
where
    A: MarketplaceApi,
    S: RenderSurface,
{
    let probe = match inner
        .api
        .fetch_page(inner.self_id, inner.key, 1, inner.config.probe_size)
        .await
    {
        Ok(page) => page,
        Err(err) => {
            tracing::warn!(error = %err, "message probe failed, skipping tick");
            return;
        }
    };

    let newest_seen = probe.messages.iter().map(|m| m.id).max();
    let has_news = {
        let store = inner.store.lock();
        match (newest_seen, store.last_known_id()) {
            (Some(probed), Some(known)) => probed > known,
            (Some(_), None) => true,
            (None, _) => false,
        }
    };
    if !has_news {
        return;
    }

    let window = match inner
        .api
        .fetch_page(inner.self_id, inner.key, 1, inner.config.page_size)
        .await
    {
        Ok(page) => page,
        Err(err) => {
            tracing::warn!(error = %err, "window fetch failed, skipping tick");
            return;
        }
    };

    // Each net-new message is published at the position the store gave
    // it, so the surface stays aligned with the store even when a pending
    // optimistic entry (local clock) sorts after a fresh server message.
    let placements = {
        let mut store = inner.store.lock();
        // The probe's page count uses a different page size; only the
        // window fetch updates the total.
        store.note_total_pages(window.total_pages);
        let applied = store.upsert_batch(&window.messages);
        let mut placements = Vec::with_capacity(applied.len());
        for msg in &applied {
            if let Some(idx) = store
                .entries()
                .iter()
                .position(|e| e.confirmed_id() == Some(msg.id))
            {
                placements.push((idx, Entry::from(msg)));
            }
        }
        placements
    };
    if placements.is_empty() {
        return;
    }
    tracing::debug!(count = placements.len(), "poll merged new messages");
    let mut surface = inner.surface.lock();
    for (idx, entry) in &placements {
        surface.insert_entry(*idx, entry);
    }
}

/// One status cycle: report presence when the conversation is on screen,
/// then pull delivery/read upgrades for our own messages.
pub(crate) async fn status_tick<A, S>(inner: &SessionInner<A, S>)
where
    A: MarketplaceApi,
    S: RenderSurface,
{
    if inner.viewing.load(Ordering::Acquire)
        && let Err(err) = inner.api.mark_seen(inner.self_id, inner.key).await
    {
        tracing::warn!(error = %err, "mark-seen report failed");
    }

    let statuses = match inner
        .api
        .fetch_statuses(inner.self_id, inner.key.peer)
        .await
    {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(error = %err, "status refresh failed, skipping tick");
            return;
        }
    };

    let mut upgrades = Vec::new();
    {
        let mut store = inner.store.lock();
        for status in &statuses {
            if let Some(upgraded) = store.apply_status(status.id, status.status) {
                upgrades.push((status.id, upgraded));
            }
        }
    }
    if upgrades.is_empty() {
        return;
    }
    let mut surface = inner.surface.lock();
    for (id, status) in upgrades {
        surface.update_status(id, status);
    }
}
