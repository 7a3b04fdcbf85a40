//! Batch inspection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::thresholds::Thresholds;
use crate::session::{TimeoutPolicy, secs};

/// How a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Targets inspected at the same time. Values below 1 count as 1.
    pub max_workers: usize,

    /// Probe TCP reachability before logging in.
    pub probe: bool,

    #[serde(with = "secs")]
    pub probe_timeout: Duration,

    /// Session timeouts used for every target.
    pub timeouts: TimeoutPolicy,

    pub thresholds: Thresholds,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            probe: true,
            probe_timeout: Duration::from_secs(3),
            timeouts: TimeoutPolicy::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl InspectionConfig {
    pub(crate) fn workers(&self) -> usize {
        self.max_workers.max(1)
    }
}
