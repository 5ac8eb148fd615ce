//! Dashboard producer configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the push producers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    /// How many trailing lines a new log tail starts with.
    pub log_tail_lines: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            log_tail_lines: 100,
        }
    }
}
