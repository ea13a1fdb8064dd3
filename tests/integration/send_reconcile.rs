//! Optimistic send reconciliation against the live sandbox.
//!
//! Covers the three endings of a send: confirmation swaps the pending
//! entry in place, a server-side rejection rolls the entry back, and
//! local validation refuses without generating any traffic.

use std::sync::Arc;
use std::time::Duration;

use staychat::config::SyncConfig;
use staychat::send::SendError;
use staychat::session::ConversationSession;
use staychat::surface::RecordingSurface;
use staychat::validate::RejectReason;
use staychat_api::client::{HttpApi, StaticCredential};
use staychat_api::error::ApiError;
use staychat_api::types::{ConversationKey, DeliveryStatus, UserId};
use staychat_sandbox::state::SandboxState;

const HOST: UserId = UserId::new(1);
const GUEST: UserId = UserId::new(2);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start_sandbox() -> (Arc<SandboxState>, String) {
    let state = Arc::new(SandboxState::new(None));
    let (addr, _handle) = staychat_sandbox::start_server("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start sandbox");
    (state, format!("http://{addr}/api/v1"))
}

async fn open_session(
    base: &str,
    self_id: UserId,
    peer: UserId,
) -> ConversationSession<HttpApi<StaticCredential>, RecordingSurface> {
    let api = HttpApi::new(base, StaticCredential::none()).expect("valid base url");
    let config = SyncConfig {
        poll_interval: Duration::from_millis(50),
        status_interval: Duration::from_millis(50),
        ..SyncConfig::default()
    };
    let mut session = ConversationSession::new(
        api,
        self_id,
        ConversationKey::general(peer),
        config,
        RecordingSurface::new(10),
    );
    session.open().await.expect("open failed");
    session
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn confirmed_send_appears_exactly_once() {
    let (_state, base) = start_sandbox().await;
    let session = open_session(&base, HOST, GUEST).await;

    let id = session
        .send("the key is in the lockbox")
        .await
        .expect("send failed");

    session.with_surface(|s| {
        let matching: Vec<_> = s
            .entries()
            .iter()
            .filter(|e| e.body == "the key is in the lockbox")
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].confirmed_id(), Some(id));
        assert!(!matching[0].is_pending());
    });

    // The poll timer must not duplicate the already-confirmed message.
    tokio::time::sleep(Duration::from_millis(300)).await;
    session.with_surface(|s| assert_eq!(s.entries().len(), 1));
}

#[tokio::test]
async fn server_rejection_rolls_the_entry_back() {
    let (state, base) = start_sandbox().await;
    let session = open_session(&base, HOST, GUEST).await;

    // The guest blocks the host after the session opened, so the local
    // gate still permits the attempt and the backend refuses it.
    state.block(GUEST, HOST);

    let err = session.send("one more thing").await.unwrap_err();
    assert!(matches!(
        err,
        SendError::Api(ApiError::Rejected { ref reason }) if reason == "conversation is blocked"
    ));
    session.with_surface(|s| assert!(s.entries().is_empty()));
}

#[tokio::test]
async fn local_rejection_sends_no_traffic() {
    let (state, base) = start_sandbox().await;
    let session = open_session(&base, HOST, GUEST).await;

    let err = session.send("   ").await.unwrap_err();
    assert!(matches!(err, SendError::Rejected(RejectReason::Empty)));

    let err = session.send("<script>alert(1)</script>").await.unwrap_err();
    assert!(matches!(
        err,
        SendError::Rejected(RejectReason::ForbiddenMarkup(_))
    ));

    session.with_surface(|s| assert!(s.entries().is_empty()));
    // Nothing reached the backend.
    assert_eq!(state.statuses(HOST, GUEST).len(), 0);
}

#[tokio::test]
async fn sent_messages_progress_to_seen() {
    let (_state, base) = start_sandbox().await;
    let host = open_session(&base, HOST, GUEST).await;
    let guest = open_session(&base, GUEST, HOST).await;

    host.send("did the directions make sense?")
        .await
        .expect("send failed");

    // The guest has the conversation on screen, so their status timer
    // reports it as seen; the host's timer then paints the upgrade.
    guest.set_viewing(true);

    for _ in 0..100 {
        let seen = host.with_surface(|s| {
            s.entries()
                .first()
                .is_some_and(|e| e.status == DeliveryStatus::Seen)
        });
        if seen {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("host never observed the seen upgrade");
}
