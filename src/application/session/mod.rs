//! Conversation sessions.

pub mod service;

pub use service::{SessionService, MAX_ATTEMPTS};
