//! HTTP surface of the sandbox backend.
//!
//! Mirrors the marketplace wire contract: JSON over `/api/v1`, with an
//! unauthenticated twin of every route under `/api/v1/guest`. When the
//! sandbox is started with a token, primary routes answer
//! `401 Unauthorized` unless the matching bearer credential is presented;
//! guest routes never check.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use staychat_api::types::{
    ChatPage, ListingId, MAX_BODY_CHARS, MessageId, StatusEntry, UserId,
};

use crate::state::SandboxState;

/// Builds the full sandbox router.
pub fn router(state: Arc<SandboxState>) -> axum::Router {
    let api = axum::Router::new()
        .route("/messages", get(fetch_page).post(send_message))
        .route("/seen", post(mark_seen))
        .route("/statuses", get(fetch_statuses))
        .route(
            "/block",
            get(block_state).put(set_block).delete(clear_block),
        )
        .route("/reports", post(report_message));

    let v1 = axum::Router::new()
        .nest("/guest", api.clone())
        .merge(api.layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            require_credential,
        )));

    axum::Router::new().nest("/api/v1", v1).with_state(state)
}

/// Rejects primary-route requests lacking the configured bearer token.
async fn require_credential(
    State(state): State<Arc<SandboxState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if let Some(expected) = &state.auth_token {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            tracing::debug!("rejecting primary request without valid credential");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    next.run(request).await
}

fn rejection(code: StatusCode, reason: &str) -> Response {
    (code, Json(serde_json::json!({ "error": reason }))).into_response()
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    self_id: UserId,
    peer_id: UserId,
    listing_id: Option<ListingId>,
    page: u32,
    per_page: u32,
}

async fn fetch_page(
    State(state): State<Arc<SandboxState>>,
    Query(query): Query<PageQuery>,
) -> Json<ChatPage> {
    let (messages, total_pages) = state.page(
        query.self_id,
        query.peer_id,
        query.listing_id,
        query.page,
        query.per_page,
    );
    Json(ChatPage {
        messages,
        total_pages,
    })
}

#[derive(Debug, Deserialize)]
struct SendBody {
    sender: UserId,
    recipient: UserId,
    listing_id: Option<ListingId>,
    body: String,
}

async fn send_message(
    State(state): State<Arc<SandboxState>>,
    Json(send): Json<SendBody>,
) -> Response {
    if !state.block_state(send.sender, send.recipient).permits_send() {
        return rejection(StatusCode::FORBIDDEN, "conversation is blocked");
    }
    if send.body.trim().is_empty() {
        return rejection(StatusCode::UNPROCESSABLE_ENTITY, "message is empty");
    }
    if send.body.chars().count() > MAX_BODY_CHARS {
        return rejection(StatusCode::UNPROCESSABLE_ENTITY, "message too long");
    }

    let message = state.insert_message(send.sender, send.recipient, send.listing_id, send.body);
    tracing::debug!(id = %message.id, sender = %message.sender, "message stored");
    Json(serde_json::json!({
        "id": message.id,
        "created_at": message.created_at,
        "status": message.status,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct SeenBody {
    self_id: UserId,
    peer_id: UserId,
    #[allow(dead_code)]
    listing_id: Option<ListingId>,
}

async fn mark_seen(
    State(state): State<Arc<SandboxState>>,
    Json(seen): Json<SeenBody>,
) -> Json<serde_json::Value> {
    state.mark_seen(seen.self_id, seen.peer_id);
    Json(serde_json::json!({}))
}

#[derive(Debug, Deserialize)]
struct PeerQuery {
    self_id: UserId,
    peer_id: UserId,
}

async fn fetch_statuses(
    State(state): State<Arc<SandboxState>>,
    Query(query): Query<PeerQuery>,
) -> Json<Vec<StatusEntry>> {
    let entries = state
        .statuses(query.self_id, query.peer_id)
        .into_iter()
        .map(|(id, status)| StatusEntry { id, status })
        .collect();
    Json(entries)
}

async fn block_state(
    State(state): State<Arc<SandboxState>>,
    Query(query): Query<PeerQuery>,
) -> Response {
    Json(state.block_state(query.self_id, query.peer_id)).into_response()
}

async fn set_block(
    State(state): State<Arc<SandboxState>>,
    Query(query): Query<PeerQuery>,
) -> Response {
    tracing::info!(blocker = %query.self_id, blocked = %query.peer_id, "block placed");
    Json(state.block(query.self_id, query.peer_id)).into_response()
}

async fn clear_block(
    State(state): State<Arc<SandboxState>>,
    Query(query): Query<PeerQuery>,
) -> Response {
    Json(state.unblock(query.self_id, query.peer_id)).into_response()
}

#[derive(Debug, Deserialize)]
struct ReportBody {
    #[allow(dead_code)]
    reporter_id: UserId,
    message_id: MessageId,
    #[allow(dead_code)]
    reason: String,
}

async fn report_message(
    State(state): State<Arc<SandboxState>>,
    Json(report): Json<ReportBody>,
) -> Response {
    if !state.knows_message(report.message_id) {
        return rejection(StatusCode::NOT_FOUND, "no such message");
    }
    tracing::info!(id = %report.message_id, "message reported");
    Json(serde_json::json!({})).into_response()
}
