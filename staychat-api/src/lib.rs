//! Wire data model and backend client for Staychat.
//!
//! This crate defines the types exchanged with the marketplace backend,
//! the [`MarketplaceApi`](client::MarketplaceApi) trait that the sync core
//! programs against, and [`HttpApi`](client::HttpApi), the HTTP/JSON
//! implementation with the unauthenticated-fallback retry policy.

pub mod client;
pub mod error;
pub mod types;

pub use client::{CredentialProvider, HttpApi, MarketplaceApi, StaticCredential};
pub use error::ApiError;
pub use types::{
    BlockState, ChatPage, ConversationKey, DeliveryStatus, ListingId, Message, MessageId,
    SendReceipt, StatusEntry, TempId, UserId,
};
