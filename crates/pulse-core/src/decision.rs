//! Decision records emitted by the rules engine.

use serde::{Deserialize, Serialize};

use crate::error::PulseError;
use crate::types::{wire_enum, ContentId, InputScores};

/// What caused a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    CrossDomain,
    SwarmBoost,
    ProactiveWarm,
    ModeChange,
    ResourceThrottle,
    InitialWarm,
    LookaheadWarm,
    Manual,
}

wire_enum!(TriggerType, UnknownTriggerType {
    CrossDomain => "CROSS_DOMAIN",
    SwarmBoost => "SWARM_BOOST",
    ProactiveWarm => "PROACTIVE_WARM",
    ModeChange => "MODE_CHANGE",
    ResourceThrottle => "RESOURCE_THROTTLE",
    InitialWarm => "INITIAL_WARM",
    LookaheadWarm => "LOOKAHEAD_WARM",
    Manual => "MANUAL",
});

/// The action a decision asks the orchestrating layer to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    InjectContent,
    ScaleWarm,
    ScaleHot,
    ThrottleBackground,
    RestoreResources,
    ChangeMode,
}

wire_enum!(ActionType, UnknownActionType {
    InjectContent => "INJECT_CONTENT",
    ScaleWarm => "SCALE_WARM",
    ScaleHot => "SCALE_HOT",
    ThrottleBackground => "THROTTLE_BACKGROUND",
    RestoreResources => "RESTORE_RESOURCES",
    ChangeMode => "CHANGE_MODE",
});

/// Immutable audit record of one rules-engine decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDecision {
    pub decision_id: String,
    /// Unix milliseconds at creation.
    pub timestamp: u64,
    pub trigger_type: TriggerType,
    /// Empty when the decision targets no single item (resource restore).
    pub affected_content_id: ContentId,
    pub reasoning_text: String,
    pub input_scores: InputScores,
    pub resulting_action: ActionType,
    /// Always true at creation; downstream failures are not reflected here.
    pub success: bool,
}
