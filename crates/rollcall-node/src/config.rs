//! Node configuration.

use std::time::Duration;

/// Configuration for a node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// How long a distributed verification waits for votes before it
    /// resolves as denied.
    pub verify_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            verify_timeout: Duration::from_secs(5),
        }
    }
}
