//! Rapport - relationship and membership consistency core of a social graph.
//!
//! Keeps directed friend edges, friend requests, bounded group membership
//! and lazily created conversation sessions consistent across a relational
//! store and a secondary cache, under concurrent writers and partial
//! failures.
//!
//! # Architecture
//!
//! - **`domain`** - Storage-agnostic types: the friend-status state machine,
//!   requests, groups and session identifier derivation
//! - **`port`** - Traits for the store, cache, repair queue and user lookup
//! - **`adapter`** - SQLite (Diesel + r2d2), in-memory cache, channel queue
//! - **`application`** - Services and the [`SocialGraph`](application::graph::SocialGraph) facade
//! - **`infrastructure`** - Configuration, logging and wiring
//!
//! Store writes that span rows always run in one transaction. Cache writes
//! happen only after commit; when they fail the fix-up is handed to a
//! repair queue instead of failing the call.
//!
//! # Example
//!
//! ```
//! use rapport::domain::session::derive_session_id;
//!
//! assert_eq!(
//!     derive_session_id(2, 7, 9),
//!     "002|0000000000000000000000000000000000000000"
//! );
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
