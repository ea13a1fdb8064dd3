//! Block relationship handling across two live sessions.

use std::sync::Arc;
use std::time::Duration;

use staychat::block::ComposerMode;
use staychat::config::SyncConfig;
use staychat::send::SendError;
use staychat::session::ConversationSession;
use staychat::surface::RecordingSurface;
use staychat_api::client::{HttpApi, StaticCredential};
use staychat_api::types::{BlockState, ConversationKey, UserId};
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
        poll_interval: Duration::from_secs(600),
        status_interval: Duration::from_secs(600),
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
async fn blocking_flips_both_composers() {
    let (_state, base) = start_sandbox().await;
    let host = open_session(&base, HOST, GUEST).await;
    let guest = open_session(&base, GUEST, HOST).await;

    assert_eq!(host.composer_mode(), ComposerMode::Compose);

    let state = host.block_peer().await.expect("block failed");
    assert_eq!(state, BlockState::BlockedByMe);
    assert_eq!(host.composer_mode(), ComposerMode::InspectOrUnblock);

    // The blocker cannot send, and the refusal names their own block.
    let err = host.send("still there?").await.unwrap_err();
    assert!(matches!(err, SendError::Blocked(BlockState::BlockedByMe)));

    // The peer learns of the block on their next state refresh and sees
    // only a neutral notice.
    let seen = guest.refresh_block_state().await.expect("refresh failed");
    assert_eq!(seen, BlockState::BlockedByPeer);
    assert_eq!(guest.composer_mode(), ComposerMode::BlockedNotice);
    guest.with_surface(|s| assert_eq!(s.block_state(), BlockState::BlockedByPeer));
}

#[tokio::test]
async fn unblocking_restores_messaging() {
    let (_state, base) = start_sandbox().await;
    let host = open_session(&base, HOST, GUEST).await;

    host.block_peer().await.expect("block failed");
    let state = host.unblock_peer().await.expect("unblock failed");
    assert_eq!(state, BlockState::Clear);
    assert_eq!(host.composer_mode(), ComposerMode::Compose);

    host.send("sorry, misclick").await.expect("send failed");
    host.with_surface(|s| assert_eq!(s.entries().len(), 1));
}

#[tokio::test]
async fn open_adopts_a_preexisting_block() {
    let (state, base) = start_sandbox().await;
    state.block(GUEST, HOST);

    let host = open_session(&base, HOST, GUEST).await;
    assert_eq!(host.composer_mode(), ComposerMode::BlockedNotice);
    host.with_surface(|s| assert_eq!(s.block_state(), BlockState::BlockedByPeer));
}

#[tokio::test]
async fn reporting_a_message_is_acknowledged() {
    let (_state, base) = start_sandbox().await;
    let host = open_session(&base, HOST, GUEST).await;
    let guest = open_session(&base, GUEST, HOST).await;

    let id = guest.send("spammy nonsense").await.expect("send failed");
    host.report_message(id, "spam").await.expect("report failed");
}
