//! In-process adapters for the cache and repair queue ports.

pub mod cache;
pub mod queue;

pub use cache::MemoryCache;
pub use queue::ChannelRepairQueue;
