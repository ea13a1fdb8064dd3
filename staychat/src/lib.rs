//! `Staychat` — conversation sync core for the stay marketplace.

pub mod block;
pub mod config;
pub mod merge;
pub mod paginate;
pub mod send;
pub mod session;
pub mod store;
pub mod surface;
pub mod validate;

mod poll;
