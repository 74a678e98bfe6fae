//! Orchestrator — wires the decision core to its collaborators.
//!
//! Every component callback is assigned once in [`Orchestrator::new`].
//! The components never call each other directly; cross-component
//! effects flow through the closures built here.
//!
//! ```text
//! focus_event ──► Scorer ──score update──► RulesEngine::process_score_update
//!      │                                        │
//!      └──► RulesEngine::process_focus_event    ├─ decision ─► log, proof, hub, mirror
//!                                               ├─ scale ────► registry, workloads, spine, proof
//!                                               ├─ mode ─────► registry, hub
//!                                               ├─ inject ───► hub
//!                                               └─ throttle ─► workloads, hub
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use pulse_core::{
    epoch_millis, AiDecision, ContainerStatus, ContentId, ContentItem, InputScores,
    OperationalMode, PulseConfig, ResourceAllocation, ThrottlePlan, TrendDirection, UserSession,
};
use pulsegrid_rules::{DecisionLog, RulesEngine};
use pulsegrid_scorer::Scorer;
use pulsegrid_state::StateStore;
use pulsegrid_telemetry::{
    ActivationPathType, ActivationPhase, ActivationSpine, ActivationSpineEvent, ProofSignalEvent,
    ProofSignalManager, ResourceWeight, TelemetrySnapshot,
};

use crate::events::{ClientEvent, DemoAction, ServerEvent};
use crate::hub::Hub;
use crate::registry::{default_catalogue, ContentRegistry};
use crate::sessions::SessionTable;
use crate::simulate;
use crate::workloads::Workloads;

/// State shared by the orchestrator and every callback it installs.
struct Shared {
    config: PulseConfig,
    registry: ContentRegistry,
    hub: Hub,
    spine: ActivationSpine,
    proof: ProofSignalManager,
    decisions: DecisionLog,
    workloads: Arc<dyn Workloads>,
    store: Option<StateStore>,
}

impl Shared {
    /// Move content to a new container state and announce it.
    ///
    /// `tracked` transitions are reported to the proof manager; forced
    /// ones are not. Returns the previous state, or `None` for unknown
    /// content.
    fn transition(
        &self,
        content_id: &str,
        target: ContainerStatus,
        tracked: bool,
    ) -> Option<ContainerStatus> {
        let Some(item) = self.registry.get_content_by_id(content_id) else {
            warn!(content = %content_id, %target, "transition for unknown content ignored");
            return None;
        };
        let old = self.registry.set_state(content_id, target)?;

        if let Err(e) = self.workloads.scale(item.deployment(), target) {
            warn!(
                content = %content_id,
                deployment = %item.deployment(),
                error = %e,
                "scale failed"
            );
        }

        self.hub.broadcast(ServerEvent::ContainerStateChange {
            content_id: content_id.to_string(),
            old_state: old,
            new_state: target,
            deployment_name: item.deployment().to_string(),
            timestamp: epoch_millis(),
        });

        if tracked {
            self.proof.on_container_state_change(content_id, old, target);
        }
        Some(old)
    }

    fn record_decision(&self, decision: &AiDecision) {
        self.decisions.push(decision.clone());
        if !decision.affected_content_id.is_empty() {
            self.proof.on_decision_made(decision);
        }
        self.hub.broadcast(ServerEvent::DecisionMade(decision.clone()));
        if let Some(ref store) = self.store {
            if let Err(e) = store.put_decision(decision) {
                warn!(decision = %decision.decision_id, error = %e, "decision mirror failed");
            }
        }
    }

    /// Run `f` after `delay` on the current runtime, or right away when
    /// delays are disabled or no runtime is available.
    fn after(self: &Arc<Self>, delay: Duration, f: impl FnOnce(&Shared) + Send + 'static) {
        if self.config.daemon.simulate_startup_delays {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let shared = Arc::clone(self);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    f(&*shared);
                });
                return;
            }
        }
        f(&**self);
    }
}

/// The assembled decision loop.
pub struct Orchestrator {
    shared: Arc<Shared>,
    scorer: Arc<Scorer>,
    engine: Arc<RulesEngine>,
    sessions: SessionTable,
}

impl Orchestrator {
    /// Assemble every component and install their callbacks.
    ///
    /// The catalogue comes from `[daemon] content`, or the built-in one
    /// when that is empty.
    pub fn new(
        config: PulseConfig,
        workloads: Arc<dyn Workloads>,
        store: Option<StateStore>,
    ) -> Self {
        let catalogue = if config.daemon.content.is_empty() {
            default_catalogue()
        } else {
            config.daemon.content.clone()
        };
        let hub = Hub::new(config.daemon.broadcast_capacity);

        let spine_hub = hub.clone();
        let spine =
            ActivationSpine::new().with_emit_fn(Arc::new(move |event: &ActivationSpineEvent| {
                spine_hub.broadcast(ServerEvent::ActivationSpine(event.clone()))
            }));

        let signal_hub = hub.clone();
        let snapshot_hub = hub.clone();
        let proof = ProofSignalManager::new(&config.telemetry)
            .with_signal_fn(Arc::new(move |event: &ProofSignalEvent| {
                signal_hub.broadcast(ServerEvent::ProofSignal(event.clone()))
            }))
            .with_snapshot_fn(Arc::new(move |snapshot: &TelemetrySnapshot| {
                snapshot_hub.broadcast(ServerEvent::TelemetryUpdate(snapshot.clone()))
            }));

        let shared = Arc::new(Shared {
            registry: ContentRegistry::new(catalogue),
            hub,
            spine,
            proof,
            decisions: DecisionLog::default(),
            workloads,
            store,
            config,
        });

        let engine = Arc::new(Self::build_engine(&shared));
        let scorer = Arc::new(Self::build_scorer(&shared, &engine));

        info!(
            content = shared.registry.get_all_content().len(),
            mirror = shared.store.is_some(),
            proof_signals = shared.proof.is_enabled(),
            "orchestrator assembled"
        );

        Self {
            shared,
            scorer,
            engine,
            sessions: SessionTable::new(),
        }
    }

    fn build_engine(shared: &Arc<Shared>) -> RulesEngine {
        let on_decision = Arc::clone(shared);
        let on_scale = Arc::clone(shared);
        let on_mode = Arc::clone(shared);
        let on_inject = Arc::clone(shared);
        let on_throttle = Arc::clone(shared);

        RulesEngine::new(shared.config.engine.clone())
            .with_decision_fn(Arc::new(move |decision: &AiDecision| {
                on_decision.record_decision(decision)
            }))
            .with_scale_fn(Arc::new(move |content_id: &str, target: ContainerStatus| {
                Self::apply_scale(&on_scale, content_id, target)
            }))
            .with_mode_change_fn(Arc::new(
                move |old: OperationalMode, new: OperationalMode, reason: &str| {
                    on_mode.registry.set_mode(new);
                    on_mode.hub.broadcast(ServerEvent::ModeChange {
                        old_mode: old,
                        new_mode: new,
                        reason: reason.to_string(),
                        timestamp: epoch_millis(),
                    });
                },
            ))
            .with_inject_fn(Arc::new(move |content: &ContentItem, position: usize, reason: &str| {
                on_inject.hub.broadcast(ServerEvent::StreamInject {
                    content: content.clone(),
                    insert_position: position,
                    reason: reason.to_string(),
                })
            }))
            .with_throttle_fn(Arc::new(move |plan: &ThrottlePlan| {
                for assignment in &plan.assignments {
                    if let Err(e) = on_throttle
                        .workloads
                        .throttle(&assignment.deployment, assignment.level)
                    {
                        warn!(
                            deployment = %assignment.deployment,
                            level = %assignment.level,
                            error = %e,
                            "throttle failed"
                        );
                    }
                }
                on_throttle.hub.broadcast(ServerEvent::ResourceUpdate(
                    ResourceAllocation::for_mode(plan.mode, epoch_millis()),
                ));
                info!(
                    mode = %plan.mode,
                    deployments = plan.assignments.len(),
                    "resource throttling applied"
                );
            }))
    }

    fn build_scorer(shared: &Arc<Shared>, engine: &Arc<RulesEngine>) -> Scorer {
        let shared = Arc::clone(shared);
        let engine = Arc::clone(engine);

        Scorer::new(shared.config.scorer.clone()).with_score_update_fn(Arc::new(
            move |content_id: &str, scores: &InputScores| {
                shared.registry.apply_scores(content_id, scores);
                let state = shared.registry.state_of(content_id).unwrap_or_default();
                engine.process_score_update(content_id, scores, state);
                shared.hub.broadcast(ServerEvent::score_update(
                    content_id,
                    scores,
                    shared.config.engine.warm_threshold,
                ));
            },
        ))
    }

    /// Scale requests from the rules engine.
    fn apply_scale(shared: &Arc<Shared>, content_id: &str, target: ContainerStatus) {
        let Some(item) = shared.registry.get_content_by_id(content_id) else {
            warn!(content = %content_id, %target, "scale for unknown content ignored");
            return;
        };
        shared.transition(content_id, target, true);

        match target {
            ContainerStatus::Warm => {
                shared.spine.record_phase(
                    content_id,
                    "",
                    ActivationPhase::PreWarm,
                    "scale_action",
                    ResourceWeight::PreviewLow,
                    false,
                );
                let id = content_id.to_string();
                shared.after(simulate::startup_delay(&item.content_type), move |shared| {
                    shared.spine.record_phase(
                        &id,
                        "",
                        ActivationPhase::PreviewReady,
                        "container_ready_simulated",
                        ResourceWeight::PreviewLow,
                        true,
                    );
                    shared.proof.on_preview_ready(&id);
                });
            }
            ContainerStatus::Hot => {
                shared.spine.record_phase(
                    content_id,
                    "",
                    ActivationPhase::Hot,
                    "scale_action",
                    ResourceWeight::FullHigh,
                    false,
                );
            }
            ContainerStatus::Cold => {}
        }
    }

    // ── Inbound events ─────────────────────────────────────────────

    /// Handle one client event.
    pub fn handle(&self, session_id: &str, event: ClientEvent) {
        debug!(session = %session_id, kind = event.kind(), "client event");
        match event {
            ClientEvent::ScrollUpdate {
                position,
                velocity,
                visible_content,
            } => self.on_scroll_update(session_id, position, velocity, visible_content),
            ClientEvent::FocusEvent {
                content_id,
                duration_ms,
                theme,
            } => self.on_focus_event(session_id, &content_id, duration_ms, &theme),
            ClientEvent::ActivationRequest { content_id } => {
                self.on_activation_request(session_id, &content_id)
            }
            ClientEvent::Deactivation { content_id } => {
                self.on_deactivation(session_id, &content_id)
            }
            ClientEvent::DemoControl {
                action,
                target_content_id,
                value,
            } => self.on_demo_control(session_id, action, &target_content_id, value),
        }
    }

    /// Warm the leading catalogue items so the first screenful is ready.
    pub fn initial_warm(&self) -> Vec<AiDecision> {
        let count = self.shared.config.daemon.initial_warm_count;
        let decisions = self
            .engine
            .process_initial_load(&self.shared.registry.get_all_content(), count);
        info!(count = decisions.len(), "initial warming requested");
        decisions
    }

    fn on_scroll_update(
        &self,
        session_id: &str,
        position: i64,
        velocity: f64,
        visible_content: Vec<ContentId>,
    ) {
        let all = self.shared.registry.get_all_content();
        let decisions = self.engine.process_scroll_update(&visible_content, &all);
        self.sessions.with_session(session_id, epoch_millis(), |session| {
            session.scroll_position = position;
            session.scroll_velocity = velocity;
            session.visible_content = visible_content;
        });
        debug!(
            session = %session_id,
            position,
            velocity,
            warmed = decisions.len(),
            "scroll update"
        );
    }

    fn on_focus_event(&self, session_id: &str, content_id: &str, duration_ms: u64, theme: &str) {
        let scores = self
            .scorer
            .record_focus_event(session_id, content_id, duration_ms, theme);
        if let Some(ref store) = self.shared.store {
            if let Err(e) = store.put_scores(session_id, content_id, &scores) {
                warn!(content = %content_id, error = %e, "score mirror failed");
            }
        }

        let Some(content) = self.shared.registry.get_content_by_id(content_id) else {
            warn!(session = %session_id, content = %content_id, "focus on unknown content");
            return;
        };

        if scores.combined > self.shared.config.daemon.intent_score_threshold {
            if !self.shared.spine.has_intent(content_id) {
                self.shared.spine.record_phase(
                    content_id,
                    session_id,
                    ActivationPhase::Intent,
                    "focus_engagement",
                    ResourceWeight::IdleMinimal,
                    false,
                );
            }
            self.shared.proof.on_intent_detected(content_id);
        }

        let all = self.shared.registry.get_all_content();
        let all_scores = self.scorer.get_all_scores(session_id);
        let decisions = self
            .sessions
            .with_session(session_id, epoch_millis(), |session| {
                session.add_focus_time(&content.theme, duration_ms);
                session.active_content_id = Some(content_id.to_string());
                self.engine
                    .process_focus_event(session, &content, duration_ms, &all, &all_scores)
            });

        debug!(
            session = %session_id,
            content = %content_id,
            duration_ms,
            combined = scores.combined,
            decisions = decisions.len(),
            "focus event processed"
        );
    }

    fn on_activation_request(&self, session_id: &str, content_id: &str) {
        let shared = &self.shared;
        let Some(content) = shared.registry.get_content_by_id(content_id) else {
            warn!(session = %session_id, content = %content_id, "activation of unknown content");
            return;
        };

        let path = shared
            .proof
            .on_activation_request(content_id, content.container_status);

        // Previously HOT content only restores inside the restore window.
        let restoring =
            path == ActivationPathType::Restore && shared.spine.is_previous_hot(content_id);
        if restoring {
            shared.spine.record_phase(
                content_id,
                session_id,
                ActivationPhase::RestoreStart,
                "session_reactivation",
                ResourceWeight::FullHigh,
                false,
            );
            shared.proof.on_restore_start(content_id);
        } else {
            shared.spine.record_phase(
                content_id,
                session_id,
                ActivationPhase::Activating,
                "user_activation",
                ResourceWeight::FullHigh,
                false,
            );
        }

        shared.transition(content_id, ContainerStatus::Hot, true);
        self.sessions
            .with_session(session_id, epoch_millis(), |session| {
                session.active_content_id = Some(content_id.to_string())
            });

        if restoring {
            let id = content_id.to_string();
            let session = session_id.to_string();
            shared.after(simulate::restore_delay(), move |shared| {
                shared.spine.record_phase(
                    &id,
                    &session,
                    ActivationPhase::RestoreComplete,
                    "restore_complete",
                    ResourceWeight::FullHigh,
                    true,
                );
                shared.proof.on_restore_complete(&id);
            });
        } else {
            shared.spine.record_phase(
                content_id,
                session_id,
                ActivationPhase::Hot,
                "activation_complete",
                ResourceWeight::FullHigh,
                false,
            );
            shared.proof.on_execution_ready(content_id);
        }

        shared.hub.send_to(
            session_id,
            ServerEvent::ActivationReady {
                content_id: content_id.to_string(),
                endpoint_url: format!("/workloads/{}", content.deployment()),
                status: ContainerStatus::Hot,
            },
        );
        info!(session = %session_id, content = %content_id, restoring, "content activated");
    }

    fn on_deactivation(&self, session_id: &str, content_id: &str) {
        let shared = &self.shared;
        if shared
            .transition(content_id, ContainerStatus::Warm, true)
            .is_none()
        {
            return;
        }

        shared.spine.record_phase(
            content_id,
            session_id,
            ActivationPhase::Deactivating,
            "user_left",
            ResourceWeight::PreviewLow,
            false,
        );
        shared.spine.record_phase(
            content_id,
            session_id,
            ActivationPhase::Cooling,
            "scaling_back",
            ResourceWeight::IdleMinimal,
            false,
        );
        shared.spine.mark_previous_hot(content_id);
        shared.proof.on_deactivation(content_id);

        self.sessions
            .with_session(session_id, epoch_millis(), |session| {
                if session.active_content_id.as_deref() == Some(content_id) {
                    session.active_content_id = None;
                }
            });
        info!(session = %session_id, content = %content_id, "content deactivated");
    }

    fn on_demo_control(&self, session_id: &str, action: DemoAction, target: &str, value: f64) {
        info!(session = %session_id, ?action, %target, value, "demo control");
        match action {
            DemoAction::TriggerTrendSpike => self.trigger_trend_spike(session_id, target, value),
            DemoAction::ResetDemo => self.reset(),
            DemoAction::ForceWarm => self.force_state(target, ContainerStatus::Warm),
            DemoAction::ForceCold => self.force_state(target, ContainerStatus::Cold),
        }
    }

    fn trigger_trend_spike(&self, session_id: &str, content_id: &str, viral_score: f64) {
        self.scorer
            .set_trend_score(content_id, viral_score, TrendDirection::Rising);
        if let (Some(store), Some(trend)) = (
            self.shared.store.as_ref(),
            self.scorer.get_trend_score(content_id),
        ) {
            if let Err(e) = store.put_trend(&trend) {
                warn!(content = %content_id, error = %e, "trend mirror failed");
            }
        }

        let Some(state) = self.shared.registry.state_of(content_id) else {
            warn!(content = %content_id, "trend spike for unknown content");
            return;
        };
        let scores = self.scorer.get_scores(session_id, content_id);
        self.engine
            .process_trend_spike(content_id, viral_score, &scores, state);
    }

    /// Out-of-band state change that telemetry must not measure.
    fn force_state(&self, content_id: &str, target: ContainerStatus) {
        self.shared.proof.invalidate_attempt(content_id);
        self.shared.transition(content_id, target, false);
    }

    /// Clear scores, timelines, attempts, decisions, sessions, and
    /// container states.
    pub fn reset(&self) {
        let shared = &self.shared;
        self.scorer.reset();
        shared.spine.reset();
        shared.proof.reset();
        shared.decisions.clear();
        shared.registry.reset_states();
        self.sessions.clear();
        if let Some(ref store) = shared.store {
            if let Err(e) = store.clear() {
                warn!(error = %e, "state mirror reset failed");
            }
        }
        info!("demo reset: all decision-loop state cleared");
    }

    // ── Background work ────────────────────────────────────────────

    /// Run score decay until shutdown.
    pub async fn run_decay(&self, shutdown: watch::Receiver<bool>) {
        self.scorer.run(shutdown).await;
    }

    // ── Read access ────────────────────────────────────────────────

    pub fn hub(&self) -> &Hub {
        &self.shared.hub
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.shared.registry
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn spine(&self) -> &ActivationSpine {
        &self.shared.spine
    }

    pub fn proof(&self) -> &ProofSignalManager {
        &self.shared.proof
    }

    /// Most recent decisions first. A limit of 0 returns all retained.
    pub fn decisions(&self, limit: usize) -> Vec<AiDecision> {
        self.shared.decisions.recent(limit)
    }

    pub fn snapshots(&self) -> HashMap<ContentId, TelemetrySnapshot> {
        self.shared.proof.get_all_snapshots()
    }

    pub fn session(&self, session_id: &str) -> Option<UserSession> {
        self.sessions.snapshot(session_id)
    }
}
