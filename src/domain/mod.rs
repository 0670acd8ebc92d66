//! Storage-agnostic domain types for the social graph.
//!
//! - [`friend`] - directed relationship edges and the status state machine
//! - [`request`] - friend requests and add-friend outcomes
//! - [`group`] - groups, capacity and membership rows
//! - [`session`] - conversation kinds and session identifier derivation

pub mod error;
pub mod friend;
pub mod group;
pub mod id;
pub mod request;
pub mod session;
