//! Canonical test configurations.
//!
//! Single source of truth for settings used across tests.

use std::time::Duration;

use crate::application::graph::GraphSettings;

/// Service settings with a short cache deadline so timeout paths run fast.
pub fn graph_settings() -> GraphSettings {
    GraphSettings {
        cache_op_timeout: Duration::from_millis(50),
        ..GraphSettings::default()
    }
}

/// Same as [`graph_settings`] with a custom friend limit.
pub fn with_max_friends(max_friends: i64) -> GraphSettings {
    GraphSettings {
        max_friends,
        ..graph_settings()
    }
}

/// Same as [`graph_settings`] with a custom cache deadline, for tests that
/// stall cache writes longer than the default allows.
pub fn with_cache_timeout(cache_op_timeout: Duration) -> GraphSettings {
    GraphSettings {
        cache_op_timeout,
        ..graph_settings()
    }
}
