//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the collaborators the social graph depends on:
//! the relational store, the key/value cache, the repair queue and the
//! user service.

pub mod cache;
pub mod queue;
pub mod store;
pub mod user;
