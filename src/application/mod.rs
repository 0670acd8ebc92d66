//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the application's use cases.

pub mod cache;
pub mod friend;
pub mod graph;
pub mod group;
pub mod repair;
pub mod session;
