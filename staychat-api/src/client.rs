//! Backend client abstraction for the sync core.
//!
//! Defines the [`MarketplaceApi`] trait that all backend implementations
//! must satisfy, plus [`HttpApi`], the production HTTP/JSON client.
//! The sync core is generic over this trait so tests can substitute an
//! in-memory backend.

use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;
use crate::types::{
    BlockState, ChatPage, ConversationKey, MessageId, SendReceipt, StatusEntry, UserId,
};

/// Source of the session credential attached to backend calls.
///
/// The credential store itself is process-wide and externally managed;
/// the client only reads the current token. `None` means "no credential
/// available" and requests go out unauthenticated.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current session token, if any.
    fn token(&self) -> Option<String>;
}

/// A fixed credential, for tests and simple deployments.
#[derive(Debug, Clone)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    /// Creates a provider that always returns the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Creates a provider with no credential.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredential {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Async backend operations the sync core depends on.
///
/// Implementations must not retry internally beyond the single
/// authentication fallback described on [`HttpApi`]; retry cadence is
/// owned by the callers (the polling and status timers).
pub trait MarketplaceApi: Send + Sync {
    /// Fetch one page of conversation history.
    ///
    /// Page 1 is the most recent window; messages ascend by creation time
    /// within the page.
    fn fetch_page(
        &self,
        self_id: UserId,
        key: ConversationKey,
        page: u32,
        per_page: u32,
    ) -> impl std::future::Future<Output = Result<ChatPage, ApiError>> + Send;

    /// Send a message to the conversation peer.
    fn send_message(
        &self,
        sender: UserId,
        key: ConversationKey,
        body: &str,
    ) -> impl std::future::Future<Output = Result<SendReceipt, ApiError>> + Send;

    /// Tell the backend the current user has seen the conversation.
    fn mark_seen(
        &self,
        self_id: UserId,
        key: ConversationKey,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// Fetch current delivery statuses for the user's own messages to `peer`.
    fn fetch_statuses(
        &self,
        self_id: UserId,
        peer: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<StatusEntry>, ApiError>> + Send;

    /// Query the block relationship between the two users.
    fn block_state(
        &self,
        self_id: UserId,
        peer: UserId,
    ) -> impl std::future::Future<Output = Result<BlockState, ApiError>> + Send;

    /// Block the peer. Returns the resulting state as seen by the backend.
    fn set_block(
        &self,
        self_id: UserId,
        peer: UserId,
    ) -> impl std::future::Future<Output = Result<BlockState, ApiError>> + Send;

    /// Remove the current user's block on the peer.
    fn clear_block(
        &self,
        self_id: UserId,
        peer: UserId,
    ) -> impl std::future::Future<Output = Result<BlockState, ApiError>> + Send;

    /// Report a message for moderation.
    fn report_message(
        &self,
        reporter: UserId,
        id: MessageId,
        reason: &str,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;
}

/// HTTP/JSON implementation of [`MarketplaceApi`].
///
/// # Authentication fallback
///
/// Every request first goes to the primary path with a bearer credential
/// (when one is available). If the backend answers `401 Unauthorized`, the
/// same semantic operation is retried exactly once on the `guest/`-prefixed
/// path without the credential header. The fallback's outcome is final —
/// this is the single place in the client where the dual-path behavior
/// lives.
pub struct HttpApi<P: CredentialProvider> {
    http: reqwest::Client,
    base: Url,
    credentials: P,
}

/// Well-formed rejection body: `{ "error": "<reason>" }`.
#[derive(Debug, serde::Deserialize)]
struct RejectionBody {
    error: String,
}

/// Empty acknowledgment body.
#[derive(Debug, serde::Deserialize)]
struct Ack {}

impl<P: CredentialProvider> HttpApi<P> {
    /// Creates a client against `base` (e.g. `http://host/api/v1/`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Url`] if `base` is not a valid URL.
    pub fn new(base: &str, credentials: P) -> Result<Self, ApiError> {
        let mut base = Url::parse(base)?;
        // A trailing slash makes Url::join treat the last segment as a
        // directory instead of replacing it.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            credentials,
        })
    }

    /// Issues a request with the authentication fallback policy applied.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let response = self.issue(method.clone(), path, query, body, true).await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(path, "primary request unauthorized, retrying on guest path");
        self.issue(method, &guest_path(path), query, body, false)
            .await
    }

    /// Builds and sends a single request, optionally with the credential.
    async fn issue(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        with_credential: bool,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.base.join(path)?;
        let mut builder = self.http.request(method, url).query(query);
        if with_credential && let Some(token) = self.credentials.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(json) = body {
            builder = builder.json(json);
        }
        Ok(builder.send().await?)
    }

    /// Decodes a response body, mapping failures into the error taxonomy.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()));
        }
        if let Ok(rejection) = serde_json::from_slice::<RejectionBody>(&bytes) {
            return Err(ApiError::Rejected {
                reason: rejection.error,
            });
        }
        Err(ApiError::Status {
            code: status.as_u16(),
        })
    }

    fn conversation_query(
        self_id: UserId,
        key: ConversationKey,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("self_id", self_id.to_string()),
            ("peer_id", key.peer.to_string()),
        ];
        if let Some(listing) = key.listing {
            query.push(("listing_id", listing.to_string()));
        }
        query
    }
}

impl<P: CredentialProvider> MarketplaceApi for HttpApi<P> {
    async fn fetch_page(
        &self,
        self_id: UserId,
        key: ConversationKey,
        page: u32,
        per_page: u32,
    ) -> Result<ChatPage, ApiError> {
        let mut query = Self::conversation_query(self_id, key);
        query.push(("page", page.to_string()));
        query.push(("per_page", per_page.to_string()));

        let response = self.request(Method::GET, "messages", &query, None).await?;
        Self::decode(response).await
    }

    async fn send_message(
        &self,
        sender: UserId,
        key: ConversationKey,
        body: &str,
    ) -> Result<SendReceipt, ApiError> {
        let payload = serde_json::json!({
            "sender": sender,
            "recipient": key.peer,
            "listing_id": key.listing,
            "body": body,
        });
        let response = self
            .request(Method::POST, "messages", &[], Some(&payload))
            .await?;
        Self::decode(response).await
    }

    async fn mark_seen(&self, self_id: UserId, key: ConversationKey) -> Result<(), ApiError> {
        let payload = serde_json::json!({
            "self_id": self_id,
            "peer_id": key.peer,
            "listing_id": key.listing,
        });
        let response = self
            .request(Method::POST, "seen", &[], Some(&payload))
            .await?;
        Self::decode::<Ack>(response).await.map(|_| ())
    }

    async fn fetch_statuses(
        &self,
        self_id: UserId,
        peer: UserId,
    ) -> Result<Vec<StatusEntry>, ApiError> {
        let query = [
            ("self_id", self_id.to_string()),
            ("peer_id", peer.to_string()),
        ];
        let response = self.request(Method::GET, "statuses", &query, None).await?;
        Self::decode(response).await
    }

    async fn block_state(&self, self_id: UserId, peer: UserId) -> Result<BlockState, ApiError> {
        let query = [
            ("self_id", self_id.to_string()),
            ("peer_id", peer.to_string()),
        ];
        let response = self.request(Method::GET, "block", &query, None).await?;
        Self::decode(response).await
    }

    async fn set_block(&self, self_id: UserId, peer: UserId) -> Result<BlockState, ApiError> {
        let query = [
            ("self_id", self_id.to_string()),
            ("peer_id", peer.to_string()),
        ];
        let response = self.request(Method::PUT, "block", &query, None).await?;
        Self::decode(response).await
    }

    async fn clear_block(&self, self_id: UserId, peer: UserId) -> Result<BlockState, ApiError> {
        let query = [
            ("self_id", self_id.to_string()),
            ("peer_id", peer.to_string()),
        ];
        let response = self.request(Method::DELETE, "block", &query, None).await?;
        Self::decode(response).await
    }

    async fn report_message(
        &self,
        reporter: UserId,
        id: MessageId,
        reason: &str,
    ) -> Result<(), ApiError> {
        let payload = serde_json::json!({
            "reporter_id": reporter,
            "message_id": id,
            "reason": reason,
        });
        let response = self
            .request(Method::POST, "reports", &[], Some(&payload))
            .await?;
        Self::decode::<Ack>(response).await.map(|_| ())
    }
}

/// Maps a primary path onto its unauthenticated fallback twin.
fn guest_path(path: &str) -> String {
    format!("guest/{path}")
}
