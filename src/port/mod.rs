//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │   (services, facade)    │
//!                    └────────────┬────────────┘
//!         ┌───────────────┬───────┴───────┬───────────────┐
//!         ▼               ▼               ▼               ▼
//!    ┌─────────┐    ┌───────────┐   ┌───────────┐   ┌───────────┐
//!    │Database │    │ KV Cache  │   │  Repair   │   │   User    │
//!    │ Adapter │    │  Adapter  │   │   Queue   │   │ Directory │
//!    └─────────┘    └───────────┘   └───────────┘   └───────────┘
//! ```

pub mod outbound;

pub use outbound::cache::KeyValueCache;
pub use outbound::queue::{RepairJob, RepairQueue};
pub use outbound::store::{
    Database, FriendRequestStore, GroupMemberStore, GroupStore, RelationshipStore, Repository,
    SessionStore,
};
pub use outbound::user::{UserDirectory, UserProfile};
