//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`db`] - Migrated SQLite databases in temporary directories.
//! - [`cache`] - `FlakyCache`, an in-memory cache with fault injection.
//! - [`queue`] - `RecordingQueue`, a repair queue that keeps its jobs.
//! - [`domain`] - ID builders and direct edge fixtures.
//! - [`config`] - Canonical test settings.
//! - [`graph`] - `TestGraph`, the facade wired over all of the above.

pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod graph;
pub mod queue;
