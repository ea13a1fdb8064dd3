//! The per-conversation session facade.
//!
//! [`ConversationSession`] owns everything a single open conversation
//! needs: the message cache, the block gate, pagination state, the send
//! queue, the caller's rendering surface, and the background timers. One
//! session per open conversation; dropping it aborts the timers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use staychat_api::client::MarketplaceApi;
use staychat_api::error::ApiError;
use staychat_api::types::{BlockState, ConversationKey, MessageId, UserId};

use crate::block::{BlockGate, ComposerMode};
use crate::config::SyncConfig;
use crate::paginate::{PaginationController, ScrollAnchor};
use crate::poll::SessionTimers;
use crate::send::{self, SendError, SendQueue};
use crate::store::{ConversationStore, Entry};
use crate::surface::RenderSurface;

/// Shared state behind the session's background timers.
pub(crate) struct SessionInner<A, S> {
    pub(crate) api: A,
    pub(crate) self_id: UserId,
    pub(crate) key: ConversationKey,
    pub(crate) config: SyncConfig,
    pub(crate) store: Mutex<ConversationStore>,
    pub(crate) gate: Mutex<BlockGate>,
    pub(crate) pagination: Mutex<PaginationController>,
    pub(crate) send_queue: SendQueue,
    pub(crate) surface: Mutex<S>,
    pub(crate) viewing: AtomicBool,
}

/// Outcome of a "load older" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOlder {
    /// An older page was fetched and prepended.
    Loaded {
        /// Net-new messages merged in.
        count: usize,
        /// Scroll offset applied to keep the viewport stable.
        scroll_adjust: u32,
    },
    /// A previous load is still in flight; this trigger was dropped.
    AlreadyLoading,
    /// The oldest page is already cached.
    NoMore,
}

/// An open conversation: history, sends, pagination, statuses, blocking.
pub struct ConversationSession<A, S> {
    inner: Arc<SessionInner<A, S>>,
    timers: Option<SessionTimers>,
}

impl<A, S> ConversationSession<A, S>
where
    A: MarketplaceApi + Send + Sync + 'static,
    S: RenderSurface + 'static,
{
    /// Creates a session over the given backend and surface. No network
    /// traffic happens until [`open`](Self::open) is called.
    #[must_use]
    pub fn new(
        api: A,
        self_id: UserId,
        key: ConversationKey,
        config: SyncConfig,
        surface: S,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                self_id,
                key,
                config,
                store: Mutex::new(ConversationStore::new(key)),
                gate: Mutex::new(BlockGate::new()),
                pagination: Mutex::new(PaginationController::new()),
                send_queue: SendQueue::new(),
                surface: Mutex::new(surface),
                viewing: AtomicBool::new(false),
            }),
            timers: None,
        }
    }

    /// Activates the conversation: refreshes the block relationship,
    /// fetches the newest history page, paints it, and starts the
    /// background timers.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the initial fetches fail; the session
    /// stays inactive and `open` can be retried.
    pub async fn open(&mut self) -> Result<(), ApiError> {
        let inner = &self.inner;
        let block = inner.api.block_state(inner.self_id, inner.key.peer).await?;
        inner.gate.lock().set_state(block);

        let page = inner
            .api
            .fetch_page(inner.self_id, inner.key, 1, inner.config.page_size)
            .await?;

        {
            let mut store = inner.store.lock();
            store.reset(inner.key);
            store.upsert_batch(&page.messages);
            store.set_page_info(1, page.total_pages);
            let mut surface = inner.surface.lock();
            surface.set_block_state(block);
            surface.reset_history(store.entries());
        }
        tracing::info!(
            conversation = %inner.key,
            messages = page.messages.len(),
            total_pages = page.total_pages,
            "conversation opened"
        );

        if self.timers.is_none() {
            self.timers = Some(SessionTimers::spawn(Arc::clone(&self.inner)));
        }
        Ok(())
    }

    /// Sends a message through the optimistic pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] for local rejection, an active block, a send
    /// already in flight, or a backend failure (rolled back).
    pub async fn send(&self, raw_body: &str) -> Result<MessageId, SendError> {
        let inner = &self.inner;
        send::deliver(
            &inner.send_queue,
            &inner.api,
            &inner.gate,
            &inner.store,
            &inner.surface,
            inner.self_id,
            inner.key,
            raw_body,
        )
        .await
    }

    /// Fetches the next older history page and prepends it, keeping the
    /// viewport visually anchored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the fetch fails; the cursor is untouched
    /// so the same page can be retried.
    pub async fn load_older(&self) -> Result<LoadOlder, ApiError> {
        let inner = &self.inner;
        let page = {
            let mut pagination = inner.pagination.lock();
            if pagination.is_loading() {
                return Ok(LoadOlder::AlreadyLoading);
            }
            let store = inner.store.lock();
            match pagination.begin(store.page_cursor(), store.total_pages()) {
                Some(page) => page,
                None => return Ok(LoadOlder::NoMore),
            }
        };

        let fetched = inner
            .api
            .fetch_page(inner.self_id, inner.key, page, inner.config.page_size)
            .await;
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                inner.pagination.lock().finish();
                return Err(err);
            }
        };

        let outcome = {
            let mut store = inner.store.lock();
            let applied = store.upsert_batch(&fetched.messages);
            store.set_page_info(page, fetched.total_pages);

            let mut surface = inner.surface.lock();
            let anchor = ScrollAnchor::capture(surface.content_height());
            let entries: Vec<Entry> = applied.iter().map(Entry::from).collect();
            surface.prepend(&entries);
            let scroll_adjust = anchor.adjustment(surface.content_height());
            surface.scroll_by(scroll_adjust);
            LoadOlder::Loaded {
                count: applied.len(),
                scroll_adjust,
            }
        };
        inner.pagination.lock().finish();
        tracing::debug!(page, ?outcome, "older page merged");
        Ok(outcome)
    }

    /// Marks the conversation as on-screen (or not). While on screen, the
    /// status timer reports incoming messages as seen.
    pub fn set_viewing(&self, viewing: bool) {
        self.inner.viewing.store(viewing, Ordering::Release);
    }

    /// What the composer area should currently offer.
    #[must_use]
    pub fn composer_mode(&self) -> ComposerMode {
        self.inner.gate.lock().composer_mode()
    }

    /// Re-reads the block relationship from the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the lookup fails; the cached state is
    /// kept.
    pub async fn refresh_block_state(&self) -> Result<BlockState, ApiError> {
        let inner = &self.inner;
        let state = inner.api.block_state(inner.self_id, inner.key.peer).await?;
        self.adopt_block_state(state);
        Ok(state)
    }

    /// Blocks the peer.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the backend refuses the change.
    pub async fn block_peer(&self) -> Result<BlockState, ApiError> {
        let inner = &self.inner;
        let state = inner.api.set_block(inner.self_id, inner.key.peer).await?;
        self.adopt_block_state(state);
        Ok(state)
    }

    /// Lifts a block previously placed by the current user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the backend refuses the change.
    pub async fn unblock_peer(&self) -> Result<BlockState, ApiError> {
        let inner = &self.inner;
        let state = inner.api.clear_block(inner.self_id, inner.key.peer).await?;
        self.adopt_block_state(state);
        Ok(state)
    }

    /// Reports a message to the marketplace moderators.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the report cannot be filed.
    pub async fn report_message(&self, id: MessageId, reason: &str) -> Result<(), ApiError> {
        self.inner
            .api
            .report_message(self.inner.self_id, id, reason)
            .await
    }

    /// Runs `f` against the painted surface (inspection, manual redraw).
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.surface.lock())
    }

    /// Whether older history pages remain.
    #[must_use]
    pub fn has_older(&self) -> bool {
        self.inner.store.lock().has_older()
    }

    fn adopt_block_state(&self, state: BlockState) {
        self.inner.gate.lock().set_state(state);
        self.inner.surface.lock().set_block_state(state);
    }

    /// Stops the background timers. Also happens on drop.
    pub fn close(&mut self) {
        self.timers = None;
        tracing::debug!(conversation = %self.inner.key, "conversation closed");
    }
}
