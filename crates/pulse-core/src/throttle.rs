//! Resource throttling levels and per-mode allocation targets.

use serde::{Deserialize, Serialize};

use crate::error::PulseError;
use crate::types::{wire_enum, ContentId, OperationalMode};

/// Resource level applied to a workload deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleLevel {
    /// Full resources for the foreground workload.
    Active,
    /// Standby resources.
    Warm,
    /// Minimal resources while another workload has focus.
    Background,
}

wire_enum!(ThrottleLevel, UnknownThrottleLevel {
    Active => "active",
    Warm => "warm",
    Background => "background",
});

/// One deployment's target level within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleAssignment {
    pub deployment: String,
    pub level: ThrottleLevel,
}

/// Throttle levels for every known deployment after a mode transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlePlan {
    pub mode: OperationalMode,
    /// The focused content, absent when returning to mixed browsing.
    pub active_content_id: Option<ContentId>,
    pub assignments: Vec<ThrottleAssignment>,
}

impl ThrottlePlan {
    /// Level assigned to a deployment, if it is part of the plan.
    pub fn level_for(&self, deployment: &str) -> Option<ThrottleLevel> {
        self.assignments
            .iter()
            .find(|a| a.deployment == deployment)
            .map(|a| a.level)
    }
}

/// Percentage split of cluster resources for a mode, for visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    /// Unix milliseconds.
    pub timestamp: u64,
    pub active_allocation: f64,
    pub warm_allocation: f64,
    pub background_allocation: f64,
    pub mode: OperationalMode,
}

impl ResourceAllocation {
    pub fn for_mode(mode: OperationalMode, now_ms: u64) -> Self {
        let (active, warm, background) = if mode.is_focus() {
            (70.0, 20.0, 10.0)
        } else {
            (0.0, 40.0, 60.0)
        };
        Self {
            timestamp: now_ms,
            active_allocation: active,
            warm_allocation: warm,
            background_allocation: background,
            mode,
        }
    }
}
