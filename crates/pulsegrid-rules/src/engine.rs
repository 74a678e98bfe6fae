//! Rules engine — turns scores and engagement events into decisions.
//!
//! Each `process_*` call evaluates its rules independently and returns
//! the decisions it made. Side effects (scaling, injection, mode change,
//! throttling) are requested through callbacks; the engine never mutates
//! container or registry state itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use pulse_core::{
    system_clock, ActionType, AiDecision, Clock, ContainerStatus, ContentId, ContentItem,
    EngineConfig, InputScores, OperationalMode, ThrottleAssignment, ThrottleLevel, ThrottlePlan,
    TriggerType, UserSession,
};

/// Position at which recommended content is inserted into the stream.
const INJECT_POSITION: usize = 1;

static DECISION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Called with every decision, in creation order.
pub type DecisionCallback = Arc<dyn Fn(&AiDecision) + Send + Sync>;

/// Called with (old_mode, new_mode, reason) on a mode transition.
pub type ModeChangeCallback = Arc<dyn Fn(OperationalMode, OperationalMode, &str) + Send + Sync>;

/// Called with (content_id, target_state) for SCALE_WARM / SCALE_HOT decisions.
pub type ScaleCallback = Arc<dyn Fn(&str, ContainerStatus) + Send + Sync>;

/// Called with (content, insert_position, reason) for an injection.
pub type InjectCallback = Arc<dyn Fn(&ContentItem, usize, &str) + Send + Sync>;

/// Called with the per-deployment throttle plan after a mode transition.
pub type ThrottleCallback = Arc<dyn Fn(&ThrottlePlan) + Send + Sync>;

/// Rule-based decision engine.
pub struct RulesEngine {
    config: EngineConfig,
    clock: Clock,
    on_decision: Option<DecisionCallback>,
    on_mode_change: Option<ModeChangeCallback>,
    on_scale: Option<ScaleCallback>,
    on_inject: Option<InjectCallback>,
    on_throttle: Option<ThrottleCallback>,
}

impl RulesEngine {
    /// Create an engine with the given thresholds.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: system_clock(),
            on_decision: None,
            on_mode_change: None,
            on_scale: None,
            on_inject: None,
            on_throttle: None,
        }
    }

    pub fn with_decision_fn(mut self, f: DecisionCallback) -> Self {
        self.on_decision = Some(f);
        self
    }

    pub fn with_mode_change_fn(mut self, f: ModeChangeCallback) -> Self {
        self.on_mode_change = Some(f);
        self
    }

    pub fn with_scale_fn(mut self, f: ScaleCallback) -> Self {
        self.on_scale = Some(f);
        self
    }

    pub fn with_inject_fn(mut self, f: InjectCallback) -> Self {
        self.on_inject = Some(f);
        self
    }

    pub fn with_throttle_fn(mut self, f: ThrottleCallback) -> Self {
        self.on_throttle = Some(f);
        self
    }

    /// Replace the clock used to stamp decisions.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a focus event: cross-domain injection, proactive warming,
    /// and mode change, each independently.
    pub fn process_focus_event(
        &self,
        session: &mut UserSession,
        focused: &ContentItem,
        duration_ms: u64,
        all_content: &[ContentItem],
        scores: &HashMap<ContentId, InputScores>,
    ) -> Vec<AiDecision> {
        debug!(
            session = %session.session_id,
            content = %focused.id,
            duration_ms,
            "processing focus event"
        );

        let mut decisions = Vec::new();

        if duration_ms >= self.config.cross_domain_focus_threshold_ms {
            decisions.extend(self.check_cross_domain(session, focused, all_content, scores));
        }

        decisions.extend(self.check_proactive_warming(focused, scores));

        if duration_ms >= self.config.mode_focus_threshold_ms {
            decisions.extend(self.check_mode_change(session, focused, all_content));
        }

        decisions
    }

    /// Scale on the combined score. The hot rule takes priority, so at
    /// most one decision results.
    pub fn process_score_update(
        &self,
        content_id: &str,
        scores: &InputScores,
        current_state: ContainerStatus,
    ) -> Option<AiDecision> {
        debug!(
            content = %content_id,
            combined = scores.combined,
            state = %current_state,
            "processing score update"
        );

        if scores.combined >= self.config.hot_threshold && current_state != ContainerStatus::Hot {
            Some(self.make_decision(
                TriggerType::CrossDomain,
                content_id,
                *scores,
                ActionType::ScaleHot,
                format!(
                    "Combined score {:.2} exceeds hot threshold {:.2}",
                    scores.combined, self.config.hot_threshold
                ),
            ))
        } else if scores.combined >= self.config.warm_threshold
            && current_state == ContainerStatus::Cold
        {
            Some(self.make_decision(
                TriggerType::ProactiveWarm,
                content_id,
                *scores,
                ActionType::ScaleWarm,
                format!(
                    "Combined score {:.2} exceeds warm threshold {:.2}",
                    scores.combined, self.config.warm_threshold
                ),
            ))
        } else {
            None
        }
    }

    /// Warm COLD content whose viral score crosses the swarm threshold.
    ///
    /// Content that is already WARM or HOT is left alone.
    pub fn process_trend_spike(
        &self,
        content_id: &str,
        viral_score: f64,
        scores: &InputScores,
        current_state: ContainerStatus,
    ) -> Option<AiDecision> {
        debug!(content = %content_id, viral_score, "processing trend spike");

        if viral_score >= self.config.swarm_trend_threshold
            && current_state == ContainerStatus::Cold
        {
            Some(self.make_decision(
                TriggerType::SwarmBoost,
                content_id,
                *scores,
                ActionType::ScaleWarm,
                format!("Swarm intelligence detected viral trend (score: {viral_score:.2})"),
            ))
        } else {
            None
        }
    }

    /// Warm the first `count` catalogue items that are still COLD.
    pub fn process_initial_load(
        &self,
        all_content: &[ContentItem],
        count: usize,
    ) -> Vec<AiDecision> {
        all_content
            .iter()
            .filter(|c| c.container_status == ContainerStatus::Cold)
            .take(count)
            .map(|c| {
                self.make_decision(
                    TriggerType::InitialWarm,
                    &c.id,
                    InputScores::default(),
                    ActionType::ScaleWarm,
                    format!("Initial warming: {} is near the top of the stream", c.id),
                )
            })
            .collect()
    }

    /// Warm visible COLD content ahead of activation, in visibility order,
    /// up to the configured lookahead limit.
    pub fn process_scroll_update(
        &self,
        visible_content: &[ContentId],
        all_content: &[ContentItem],
    ) -> Vec<AiDecision> {
        visible_content
            .iter()
            .filter_map(|id| all_content.iter().find(|c| &c.id == id))
            .filter(|c| c.container_status == ContainerStatus::Cold)
            .take(self.config.lookahead_limit)
            .map(|c| {
                self.make_decision(
                    TriggerType::LookaheadWarm,
                    &c.id,
                    InputScores::default(),
                    ActionType::ScaleWarm,
                    format!("Lookahead warming: {} scrolled into view", c.id),
                )
            })
            .collect()
    }

    fn check_cross_domain(
        &self,
        session: &mut UserSession,
        focused: &ContentItem,
        all_content: &[ContentItem],
        scores: &HashMap<ContentId, InputScores>,
    ) -> Option<AiDecision> {
        let related = all_content.iter().find(|c| {
            c.id != focused.id
                && c.theme == focused.theme
                && c.content_type != focused.content_type
                && !session.has_injected(&c.id)
        })?;

        let base = scores.get(&related.id).copied().unwrap_or_default();
        let boost = self.config.cross_domain_score_boost;
        let boosted = InputScores::new(
            (base.personal + boost).min(1.0),
            base.global,
            (base.combined + boost * 0.5).min(1.0),
        );

        let decision = self.make_decision(
            TriggerType::CrossDomain,
            &related.id,
            boosted,
            ActionType::InjectContent,
            format!(
                "Cross-domain recommendation: user engaged with {} {}, suggesting related {}",
                focused.content_type, focused.theme, related.content_type
            ),
        );

        if let Some(ref f) = self.on_inject {
            f(related, INJECT_POSITION, "Cross-domain recommendation based on theme affinity");
        }

        session.mark_injected(&related.id);
        Some(decision)
    }

    fn check_proactive_warming(
        &self,
        focused: &ContentItem,
        scores: &HashMap<ContentId, InputScores>,
    ) -> Option<AiDecision> {
        let scores = scores.get(&focused.id).copied().unwrap_or_default();

        if scores.combined >= self.config.warm_threshold
            && focused.container_status == ContainerStatus::Cold
        {
            Some(self.make_decision(
                TriggerType::ProactiveWarm,
                &focused.id,
                scores,
                ActionType::ScaleWarm,
                format!(
                    "Proactive warming: engagement score {:.2} indicates likely activation",
                    scores.combined
                ),
            ))
        } else {
            None
        }
    }

    fn check_mode_change(
        &self,
        session: &mut UserSession,
        focused: &ContentItem,
        all_content: &[ContentItem],
    ) -> Vec<AiDecision> {
        let new_mode = OperationalMode::for_content_type(&focused.content_type);
        let old_mode = session.current_mode;
        if old_mode == new_mode {
            return Vec::new();
        }

        let reason = match new_mode {
            OperationalMode::GameFocusMode => "Extended engagement with gaming content",
            OperationalMode::AiServiceMode => "Extended engagement with AI service",
            OperationalMode::MixedStreamBrowsing => "Mixed content browsing",
        };

        let mut decisions = vec![self.make_decision(
            TriggerType::ModeChange,
            &focused.id,
            InputScores::default(),
            ActionType::ChangeMode,
            format!("Mode change from {old_mode} to {new_mode}: {reason}"),
        )];

        if let Some(ref f) = self.on_mode_change {
            f(old_mode, new_mode, reason);
        }

        let plan = throttle_plan(new_mode, Some(focused), all_content);
        let (target, action, reasoning) = if new_mode.is_focus() {
            (
                focused.id.as_str(),
                ActionType::ThrottleBackground,
                format!(
                    "Throttling background workloads for {} focus mode",
                    focused.content_type
                ),
            )
        } else {
            (
                "",
                ActionType::RestoreResources,
                "Restoring resources for mixed stream browsing".to_string(),
            )
        };
        decisions.push(self.make_decision(
            TriggerType::ResourceThrottle,
            target,
            InputScores::default(),
            action,
            reasoning,
        ));

        if let Some(ref f) = self.on_throttle {
            f(&plan);
        }

        session.current_mode = new_mode;
        decisions
    }

    fn make_decision(
        &self,
        trigger: TriggerType,
        content_id: &str,
        scores: InputScores,
        action: ActionType,
        reasoning: String,
    ) -> AiDecision {
        let now = (self.clock)();
        let seq = DECISION_SEQ.fetch_add(1, Ordering::Relaxed);
        let decision = AiDecision {
            decision_id: format!("dec-{now}-{seq}"),
            timestamp: now,
            trigger_type: trigger,
            affected_content_id: content_id.to_string(),
            reasoning_text: reasoning,
            input_scores: scores,
            resulting_action: action,
            success: true,
        };

        info!(
            trigger = %trigger,
            content = %content_id,
            action = %action,
            reasoning = %decision.reasoning_text,
            "decision made"
        );

        if let Some(ref f) = self.on_decision {
            f(&decision);
        }

        if let Some(ref f) = self.on_scale {
            match action {
                ActionType::ScaleWarm => f(content_id, ContainerStatus::Warm),
                ActionType::ScaleHot => f(content_id, ContainerStatus::Hot),
                _ => {}
            }
        }

        decision
    }
}

/// Throttle levels for every distinct deployment in the catalogue.
///
/// Focus modes give the focused deployment `active` and everything else
/// `background`; mixed browsing puts everything back to `warm`.
fn throttle_plan(
    mode: OperationalMode,
    focused: Option<&ContentItem>,
    all_content: &[ContentItem],
) -> ThrottlePlan {
    let active = focused.filter(|_| mode.is_focus());
    let active_deployment = active.map(|c| c.deployment());

    let mut assignments: Vec<ThrottleAssignment> = Vec::new();
    let deployments = all_content
        .iter()
        .map(|c| c.deployment())
        .chain(active_deployment);
    for deployment in deployments {
        if assignments.iter().any(|a| a.deployment == deployment) {
            continue;
        }
        let level = match active_deployment {
            Some(active) if active == deployment => ThrottleLevel::Active,
            Some(_) => ThrottleLevel::Background,
            None => ThrottleLevel::Warm,
        };
        assignments.push(ThrottleAssignment {
            deployment: deployment.to_string(),
            level,
        });
    }

    ThrottlePlan {
        mode,
        active_content_id: active.map(|c| c.id.clone()),
        assignments,
    }
}
