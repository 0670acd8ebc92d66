//! Group lifecycle and bounded membership.

pub mod service;

pub use service::{GroupDetails, GroupMetadata, GroupService, MemberRemoval};
