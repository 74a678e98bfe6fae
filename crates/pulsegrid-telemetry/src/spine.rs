//! Activation spine — per-content phase timelines.
//!
//! Timelines are append-only. Elapsed time on each event is measured
//! from the most recent INTENT phase of that timeline.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use pulse_core::{system_clock, Clock, ContentId, SessionId};

static SPINE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Qualitative activation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationPhase {
    Intent,
    PreWarm,
    PreviewReady,
    Activating,
    Hot,
    Deactivating,
    Cooling,
    RestoreStart,
    RestoreComplete,
}

impl ActivationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "INTENT",
            Self::PreWarm => "PRE_WARM",
            Self::PreviewReady => "PREVIEW_READY",
            Self::Activating => "ACTIVATING",
            Self::Hot => "HOT",
            Self::Deactivating => "DEACTIVATING",
            Self::Cooling => "COOLING",
            Self::RestoreStart => "RESTORE_START",
            Self::RestoreComplete => "RESTORE_COMPLETE",
        }
    }
}

impl fmt::Display for ActivationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative resource footprint of a phase, for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceWeight {
    IdleMinimal,
    PreviewLow,
    FullHigh,
}

/// One recorded phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationSpineEvent {
    pub event_id: String,
    pub content_id: ContentId,
    pub session_id: SessionId,
    pub phase: ActivationPhase,
    /// Unix milliseconds.
    pub timestamp: u64,
    /// Milliseconds since the latest INTENT, 0 if none was recorded.
    pub elapsed_from_start_ms: u64,
    pub resource_weight: ResourceWeight,
    pub trigger_source: String,
    /// True when the phase was produced by a simulated delay rather than
    /// an observed workload transition.
    pub is_simulated: bool,
}

/// Phase history for one content item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentTimeline {
    pub content_id: ContentId,
    /// Sticky: an empty session id never clears it.
    pub session_id: SessionId,
    /// Anchor for elapsed-time computation.
    pub intent_time: Option<u64>,
    pub phases: Vec<ActivationSpineEvent>,
    pub previous_hot: bool,
}

impl ContentTimeline {
    fn new(content_id: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            ..Self::default()
        }
    }

    /// The most recently recorded phase.
    pub fn latest_phase(&self) -> Option<ActivationPhase> {
        self.phases.last().map(|e| e.phase)
    }
}

/// Callback invoked with every recorded phase event.
pub type PhaseCallback = Arc<dyn Fn(&ActivationSpineEvent) + Send + Sync>;

/// Tracks activation timelines for all content items.
pub struct ActivationSpine {
    timelines: RwLock<HashMap<ContentId, ContentTimeline>>,
    clock: Clock,
    on_emit: Option<PhaseCallback>,
}

impl Default for ActivationSpine {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationSpine {
    pub fn new() -> Self {
        Self {
            timelines: RwLock::new(HashMap::new()),
            clock: system_clock(),
            on_emit: None,
        }
    }

    pub fn with_emit_fn(mut self, f: PhaseCallback) -> Self {
        self.on_emit = Some(f);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Append a phase to the content's timeline, creating it on first use.
    pub fn record_phase(
        &self,
        content_id: &str,
        session_id: &str,
        phase: ActivationPhase,
        trigger_source: &str,
        resource_weight: ResourceWeight,
        is_simulated: bool,
    ) -> ActivationSpineEvent {
        let now = (self.clock)();

        let event = {
            let mut timelines = self.timelines.write().expect("spine lock");
            let timeline = timelines
                .entry(content_id.to_string())
                .or_insert_with(|| ContentTimeline::new(content_id));

            if !session_id.is_empty() {
                timeline.session_id = session_id.to_string();
            }
            if phase == ActivationPhase::Intent {
                timeline.intent_time = Some(now);
            }
            let elapsed = timeline
                .intent_time
                .map(|anchor| now.saturating_sub(anchor))
                .unwrap_or(0);

            let seq = SPINE_SEQ.fetch_add(1, Ordering::Relaxed);
            let event = ActivationSpineEvent {
                event_id: format!("spine-{now}-{seq}-{phase}"),
                content_id: content_id.to_string(),
                session_id: timeline.session_id.clone(),
                phase,
                timestamp: now,
                elapsed_from_start_ms: elapsed,
                resource_weight,
                trigger_source: trigger_source.to_string(),
                is_simulated,
            };
            timeline.phases.push(event.clone());
            event
        };

        debug!(
            content = %content_id,
            %phase,
            elapsed_ms = event.elapsed_from_start_ms,
            trigger = %trigger_source,
            simulated = is_simulated,
            "activation phase"
        );

        if let Some(ref f) = self.on_emit {
            f(&event);
        }
        event
    }

    pub fn get_timeline(&self, content_id: &str) -> Option<ContentTimeline> {
        self.timelines
            .read()
            .expect("spine lock")
            .get(content_id)
            .cloned()
    }

    /// True if an INTENT phase appears anywhere in the content's history.
    pub fn has_intent(&self, content_id: &str) -> bool {
        self.timelines
            .read()
            .expect("spine lock")
            .get(content_id)
            .is_some_and(|t| t.phases.iter().any(|e| e.phase == ActivationPhase::Intent))
    }

    pub fn mark_previous_hot(&self, content_id: &str) {
        let mut timelines = self.timelines.write().expect("spine lock");
        timelines
            .entry(content_id.to_string())
            .or_insert_with(|| ContentTimeline::new(content_id))
            .previous_hot = true;
    }

    pub fn is_previous_hot(&self, content_id: &str) -> bool {
        self.timelines
            .read()
            .expect("spine lock")
            .get(content_id)
            .is_some_and(|t| t.previous_hot)
    }

    pub fn len(&self) -> usize {
        self.timelines.read().expect("spine lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every timeline.
    pub fn reset(&self) {
        self.timelines.write().expect("spine lock").clear();
    }
}
