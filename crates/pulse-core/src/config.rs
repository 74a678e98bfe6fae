//! pulse.toml configuration parser.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock tuning.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PulseResult;
use crate::types::ContentItem;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub scorer: ScorerConfig,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
    pub daemon: DaemonConfig,
}

/// Score blending and decay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub personal_weight: f64,
    pub global_weight: f64,
    pub trend_weight: f64,
    /// Fraction removed from each score per decay tick.
    pub decay_rate: f64,
    pub decay_interval_ms: u64,
    /// Personal score gained per second of focus.
    pub focus_duration_scale: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            personal_weight: 0.4,
            global_weight: 0.4,
            trend_weight: 0.2,
            decay_rate: 0.01,
            decay_interval_ms: 5_000,
            focus_duration_scale: 0.1,
        }
    }
}

impl ScorerConfig {
    pub fn decay_interval(&self) -> Duration {
        Duration::from_millis(self.decay_interval_ms)
    }
}

/// Rules engine thresholds and durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub warm_threshold: f64,
    pub hot_threshold: f64,
    pub cross_domain_focus_threshold_ms: u64,
    pub cross_domain_score_boost: f64,
    pub swarm_trend_threshold: f64,
    pub mode_focus_threshold_ms: u64,
    /// Maximum COLD items warmed per scroll update.
    pub lookahead_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warm_threshold: 0.6,
            hot_threshold: 0.8,
            cross_domain_focus_threshold_ms: 5_000,
            cross_domain_score_boost: 0.2,
            swarm_trend_threshold: 0.7,
            mode_focus_threshold_ms: 10_000,
            lookahead_limit: 2,
        }
    }
}

/// Proof signal tracking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub proof_signals_enabled: bool,
    /// Window after a focus loss in which reactivation counts as a restore.
    pub restore_window_ms: u64,
    /// Capacity of the proof signal ring buffer.
    pub max_signals: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            proof_signals_enabled: true,
            restore_window_ms: 5_000,
            max_signals: 200,
        }
    }
}

/// Orchestrating daemon settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Outbound event channel capacity; slow subscribers drop events past this.
    pub broadcast_capacity: usize,
    /// Number of leading catalogue items warmed at startup.
    pub initial_warm_count: usize,
    /// Combined score above which a focus event counts as activation intent.
    pub intent_score_threshold: f64,
    /// Delay PREVIEW_READY / RESTORE_COMPLETE by a simulated start-up time.
    pub simulate_startup_delays: bool,
    /// Content catalogue. Empty means the built-in catalogue.
    pub content: Vec<ContentItem>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            initial_warm_count: 2,
            intent_score_threshold: 0.3,
            simulate_startup_delays: true,
            content: Vec::new(),
        }
    }
}

impl PulseConfig {
    pub fn from_file(path: &Path) -> PulseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PulseResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> PulseResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
