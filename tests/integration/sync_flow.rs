//! End-to-end sync over a real HTTP round trip.
//!
//! Runs the sandbox backend in-process and drives a session through the
//! production `HttpApi` client: opening paints the newest window, the
//! poll timer picks up messages the peer sends afterwards, and the
//! authentication fallback reaches the guest routes when the primary
//! routes refuse the credential.

use std::sync::Arc;
use std::time::Duration;

use staychat::config::SyncConfig;
use staychat::session::ConversationSession;
use staychat::surface::RecordingSurface;
use staychat_api::client::{HttpApi, StaticCredential};
use staychat_api::types::{ConversationKey, UserId};
use staychat_sandbox::state::SandboxState;

const HOST: UserId = UserId::new(1);
const GUEST: UserId = UserId::new(2);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Starts a sandbox and returns its state handle and base URL.
async fn start_sandbox(auth_token: Option<&str>) -> (Arc<SandboxState>, String) {
    let state = Arc::new(SandboxState::new(auth_token.map(str::to_string)));
    let (addr, _handle) = staychat_sandbox::start_server("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start sandbox");
    (state, format!("http://{addr}/api/v1"))
}

/// A session for `self_id` talking to `peer`, with fast timer cadences.
fn session_against(
    base: &str,
    credential: StaticCredential,
    self_id: UserId,
    peer: UserId,
) -> ConversationSession<HttpApi<StaticCredential>, RecordingSurface> {
    let api = HttpApi::new(base, credential).expect("valid base url");
    let config = SyncConfig {
        poll_interval: Duration::from_millis(50),
        status_interval: Duration::from_millis(50),
        ..SyncConfig::default()
    };
    ConversationSession::new(
        api,
        self_id,
        ConversationKey::general(peer),
        config,
        RecordingSurface::new(10),
    )
}

/// Polls the session's surface until `predicate` holds or a deadline passes.
async fn wait_for<A, S, F>(session: &ConversationSession<A, S>, predicate: F)
where
    A: staychat_api::client::MarketplaceApi + Send + Sync + 'static,
    S: staychat::surface::RenderSurface + 'static,
    F: Fn(&S) -> bool,
{
    for _ in 0..100 {
        if session.with_surface(&predicate) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("surface never reached the expected state");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_paints_seeded_history() {
    let (state, base) = start_sandbox(None).await;
    state.insert_message(GUEST, HOST, None, "is the attic room free in may?".into());
    state.insert_message(HOST, GUEST, None, "it is, from the 12th".into());

    let mut session = session_against(&base, StaticCredential::none(), HOST, GUEST);
    session.open().await.expect("open failed");

    session.with_surface(|s| {
        assert_eq!(s.entries().len(), 2);
        assert_eq!(s.entries()[0].body, "is the attic room free in may?");
        assert_eq!(s.entries()[1].body, "it is, from the 12th");
    });
}

#[tokio::test]
async fn poll_timer_picks_up_peer_messages() {
    let (state, base) = start_sandbox(None).await;
    let mut session = session_against(&base, StaticCredential::none(), HOST, GUEST);
    session.open().await.expect("open failed");
    session.with_surface(|s| assert!(s.entries().is_empty()));

    state.insert_message(GUEST, HOST, None, "just booked!".into());

    wait_for(&session, |s| {
        s.entries().iter().any(|e| e.body == "just booked!")
    })
    .await;
}

#[tokio::test]
async fn messages_cross_between_two_live_sessions() {
    let (_state, base) = start_sandbox(None).await;

    let mut host = session_against(&base, StaticCredential::none(), HOST, GUEST);
    let mut guest = session_against(&base, StaticCredential::none(), GUEST, HOST);
    host.open().await.expect("host open failed");
    guest.open().await.expect("guest open failed");

    host.send("welcome, checkout is at 11").await.expect("send failed");

    wait_for(&guest, |s| {
        s.entries()
            .iter()
            .any(|e| e.body == "welcome, checkout is at 11")
    })
    .await;
}

#[tokio::test]
async fn wrong_credential_falls_back_to_guest_routes() {
    let (state, base) = start_sandbox(Some("real-token")).await;
    state.insert_message(GUEST, HOST, None, "hello from the other side".into());

    // No credential at all: every primary call 401s, guest answers.
    let mut session = session_against(&base, StaticCredential::none(), HOST, GUEST);
    session.open().await.expect("guest fallback open failed");
    session.with_surface(|s| assert_eq!(s.entries().len(), 1));

    // The real token uses the primary routes directly.
    let mut authed = session_against(&base, StaticCredential::new("real-token"), HOST, GUEST);
    authed.open().await.expect("authenticated open failed");
    authed.with_surface(|s| assert_eq!(s.entries().len(), 1));
}
