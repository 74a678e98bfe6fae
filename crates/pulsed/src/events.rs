//! Inbound client events and outbound server events.
//!
//! Both directions use `{"type": "...", "payload": {...}}` on the wire.

use serde::{Deserialize, Serialize};

use pulse_core::{
    AiDecision, ContainerStatus, ContentId, ContentItem, InputScores, OperationalMode,
    ResourceAllocation, SessionId,
};
use pulsegrid_telemetry::{ActivationSpineEvent, ProofSignalEvent, TelemetrySnapshot};

/// Events a client sends about its engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    ScrollUpdate {
        #[serde(default)]
        position: i64,
        #[serde(default)]
        velocity: f64,
        #[serde(default)]
        visible_content: Vec<ContentId>,
    },
    FocusEvent {
        content_id: ContentId,
        duration_ms: u64,
        #[serde(default)]
        theme: String,
    },
    ActivationRequest {
        content_id: ContentId,
    },
    Deactivation {
        content_id: ContentId,
    },
    DemoControl {
        action: DemoAction,
        #[serde(default)]
        target_content_id: ContentId,
        #[serde(default)]
        value: f64,
    },
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScrollUpdate { .. } => "scroll_update",
            Self::FocusEvent { .. } => "focus_event",
            Self::ActivationRequest { .. } => "activation_request",
            Self::Deactivation { .. } => "deactivation",
            Self::DemoControl { .. } => "demo_control",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoAction {
    TriggerTrendSpike,
    ResetDemo,
    ForceWarm,
    ForceCold,
}

/// One line of a replay file: a client event tagged with its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub session_id: SessionId,
    pub event: ClientEvent,
}

/// Events pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    DecisionMade(AiDecision),
    ContainerStateChange {
        content_id: ContentId,
        old_state: ContainerStatus,
        new_state: ContainerStatus,
        deployment_name: String,
        /// Unix milliseconds.
        timestamp: u64,
    },
    ScoreUpdate {
        content_id: ContentId,
        personal_score: f64,
        global_score: f64,
        combined_score: f64,
        threshold_exceeded: bool,
    },
    ModeChange {
        old_mode: OperationalMode,
        new_mode: OperationalMode,
        reason: String,
        timestamp: u64,
    },
    StreamInject {
        content: ContentItem,
        insert_position: usize,
        reason: String,
    },
    ResourceUpdate(ResourceAllocation),
    ActivationReady {
        content_id: ContentId,
        endpoint_url: String,
        status: ContainerStatus,
    },
    ActivationSpine(ActivationSpineEvent),
    ProofSignal(ProofSignalEvent),
    TelemetryUpdate(TelemetrySnapshot),
}

impl ServerEvent {
    pub fn score_update(content_id: &str, scores: &InputScores, warm_threshold: f64) -> Self {
        Self::ScoreUpdate {
            content_id: content_id.to_string(),
            personal_score: scores.personal,
            global_score: scores.global,
            combined_score: scores.combined,
            threshold_exceeded: scores.combined >= warm_threshold,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DecisionMade(_) => "decision_made",
            Self::ContainerStateChange { .. } => "container_state_change",
            Self::ScoreUpdate { .. } => "score_update",
            Self::ModeChange { .. } => "mode_change",
            Self::StreamInject { .. } => "stream_inject",
            Self::ResourceUpdate(_) => "resource_update",
            Self::ActivationReady { .. } => "activation_ready",
            Self::ActivationSpine(_) => "activation_spine",
            Self::ProofSignal(_) => "proof_signal",
            Self::TelemetryUpdate(_) => "telemetry_update",
        }
    }
}
