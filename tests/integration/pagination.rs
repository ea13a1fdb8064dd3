//! Backward pagination against the live sandbox.

use std::sync::Arc;
use std::time::Duration;

use staychat::config::SyncConfig;
use staychat::session::{ConversationSession, LoadOlder};
use staychat::surface::RecordingSurface;
use staychat_api::client::{HttpApi, StaticCredential};
use staychat_api::types::{ConversationKey, UserId};
use staychat_sandbox::state::SandboxState;

const HOST: UserId = UserId::new(1);
const GUEST: UserId = UserId::new(2);
const ROW_HEIGHT: u32 = 10;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sandbox preloaded with `count` guest messages, plus an open session.
async fn seeded_session(
    count: usize,
) -> ConversationSession<HttpApi<StaticCredential>, RecordingSurface> {
    let state = Arc::new(SandboxState::new(None));
    for i in 0..count {
        state.insert_message(GUEST, HOST, None, format!("message {i}"));
    }
    let (addr, _handle) = staychat_sandbox::start_server("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start sandbox");

    let api = HttpApi::new(&format!("http://{addr}/api/v1"), StaticCredential::none())
        .expect("valid base url");
    let config = SyncConfig {
        // Slow timers so pagination runs without poll interference.
        poll_interval: Duration::from_secs(600),
        status_interval: Duration::from_secs(600),
        ..SyncConfig::default()
    };
    let mut session = ConversationSession::new(
        api,
        HOST,
        ConversationKey::general(GUEST),
        config,
        RecordingSurface::new(ROW_HEIGHT),
    );
    session.open().await.expect("open failed");
    session
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_older_page_prepends_in_order() {
    let session = seeded_session(45).await;

    // Newest window first: messages 25..45.
    session.with_surface(|s| {
        assert_eq!(s.entries().len(), 20);
        assert_eq!(s.entries()[0].body, "message 25");
    });
    assert!(session.has_older());

    let outcome = session.load_older().await.expect("load failed");
    assert_eq!(
        outcome,
        LoadOlder::Loaded {
            count: 20,
            scroll_adjust: 20 * ROW_HEIGHT,
        }
    );
    session.with_surface(|s| {
        assert_eq!(s.entries().len(), 40);
        assert_eq!(s.entries()[0].body, "message 5");
        // The viewport stayed anchored on the previously visible rows.
        assert_eq!(s.scroll_top(), 20 * ROW_HEIGHT);
    });

    // The final, short page.
    let outcome = session.load_older().await.expect("load failed");
    assert_eq!(
        outcome,
        LoadOlder::Loaded {
            count: 5,
            scroll_adjust: 5 * ROW_HEIGHT,
        }
    );
    session.with_surface(|s| {
        assert_eq!(s.entries().len(), 45);
        assert_eq!(s.entries()[0].body, "message 0");
    });

    assert!(!session.has_older());
    assert_eq!(session.load_older().await.expect("load failed"), LoadOlder::NoMore);
}

#[tokio::test]
async fn ordering_survives_interleaved_pagination_and_sends() {
    let session = seeded_session(30).await;

    session.send("a fresh reply").await.expect("send failed");
    session.load_older().await.expect("load failed");

    session.with_surface(|s| {
        assert_eq!(s.entries().len(), 31);
        assert_eq!(s.entries()[0].body, "message 0");
        assert_eq!(s.entries()[30].body, "a fresh reply");
    });
}

#[tokio::test]
async fn single_page_conversation_has_nothing_older() {
    let session = seeded_session(5).await;
    assert!(!session.has_older());
    assert_eq!(session.load_older().await.expect("load failed"), LoadOlder::NoMore);
}
