//! End-to-end tests for the assembled decision loop.

use std::sync::Arc;
use std::time::Duration;

use pulse_core::{
    ActionType, ContainerStatus, OperationalMode, PulseConfig, ThrottleLevel, TriggerType,
};
use pulsed::{
    ClientEvent, DemoAction, Orchestrator, Outbound, ServerEvent, SimulatedWorkloads, WorkloadCall,
};
use pulsegrid_state::StateStore;
use pulsegrid_telemetry::{ActivationPathType, ActivationPhase};
use tokio::sync::broadcast;

// ── Helpers ────────────────────────────────────────────────────────

fn config() -> PulseConfig {
    let mut config = PulseConfig::default();
    config.daemon.simulate_startup_delays = false;
    config.daemon.broadcast_capacity = 4096;
    config
}

fn orchestrator() -> (Orchestrator, Arc<SimulatedWorkloads>) {
    let workloads = Arc::new(SimulatedWorkloads::new());
    let orchestrator = Orchestrator::new(config(), workloads.clone(), None);
    (orchestrator, workloads)
}

fn drain_outbound(rx: &mut broadcast::Receiver<Outbound>) -> Vec<Outbound> {
    let mut queued = Vec::new();
    while let Ok(outbound) = rx.try_recv() {
        queued.push(outbound);
    }
    queued
}

fn drain(rx: &mut broadcast::Receiver<Outbound>) -> Vec<ServerEvent> {
    drain_outbound(rx).into_iter().map(|o| o.event).collect()
}

fn focus(content_id: &str, duration_ms: u64) -> ClientEvent {
    ClientEvent::FocusEvent {
        content_id: content_id.to_string(),
        duration_ms,
        theme: String::new(),
    }
}

fn activate(content_id: &str) -> ClientEvent {
    ClientEvent::ActivationRequest {
        content_id: content_id.to_string(),
    }
}

fn deactivate(content_id: &str) -> ClientEvent {
    ClientEvent::Deactivation {
        content_id: content_id.to_string(),
    }
}

fn demo(action: DemoAction, target: &str, value: f64) -> ClientEvent {
    ClientEvent::DemoControl {
        action,
        target_content_id: target.to_string(),
        value,
    }
}

// ── Activation paths ───────────────────────────────────────────────

#[test]
fn cold_activation_is_a_cache_miss() {
    let (orch, _) = orchestrator();
    let mut rx = orch.hub().subscribe();

    orch.handle("s1", activate("game-poker-quest"));

    let snapshot = orch.proof().snapshot("game-poker-quest").unwrap();
    assert_eq!(snapshot.activation_path_type, Some(ActivationPathType::Cold));
    assert!(!snapshot.cache_hit_indicator);
    assert!(snapshot.hot_entered_ts > 0);
    assert!(snapshot.execution_ready_ts > 0);
    assert!(snapshot.activation_latency_ms >= 0);
    assert_eq!(
        orch.registry().state_of("game-poker-quest"),
        Some(ContainerStatus::Hot)
    );

    let outbound = drain_outbound(&mut rx)
        .into_iter()
        .find(|o| matches!(o.event, ServerEvent::ActivationReady { .. }))
        .unwrap();
    assert!(outbound.is_for("s1"));
    assert!(!outbound.is_for("s2"));
    match outbound.event {
        ServerEvent::ActivationReady { endpoint_url, .. } => {
            assert_eq!(endpoint_url, "/workloads/game-poker-quest")
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn trend_spike_then_activation_is_a_prewarm_hit() {
    let (orch, workloads) = orchestrator();

    orch.handle(
        "s1",
        demo(DemoAction::TriggerTrendSpike, "game-poker-quest", 0.9),
    );
    assert_eq!(
        orch.registry().state_of("game-poker-quest"),
        Some(ContainerStatus::Warm)
    );

    let decision = &orch.decisions(1)[0];
    assert_eq!(decision.trigger_type, TriggerType::SwarmBoost);
    assert_eq!(decision.resulting_action, ActionType::ScaleWarm);
    assert!(decision.success);

    let timeline = orch.spine().get_timeline("game-poker-quest").unwrap();
    let phases: Vec<_> = timeline.phases.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![ActivationPhase::PreWarm, ActivationPhase::PreviewReady]
    );
    assert!(timeline.phases[1].is_simulated);

    orch.handle("s1", activate("game-poker-quest"));

    let snapshot = orch.proof().snapshot("game-poker-quest").unwrap();
    assert_eq!(snapshot.activation_path_type, Some(ActivationPathType::Prewarm));
    assert!(snapshot.cache_hit_indicator);
    assert_eq!(snapshot.trigger_type, Some(TriggerType::SwarmBoost));
    assert!(snapshot.decision_ts > 0);
    assert!(snapshot.prewarm_start_ts > 0);
    assert!(snapshot.warm_ready_ts > 0);
    assert!(snapshot.prewarm_duration_ms >= 0);
    assert!(snapshot.execution_ready_latency_ms >= 0);

    assert!(workloads.calls().iter().any(|call| matches!(
        call,
        WorkloadCall::Scale { deployment, target: ContainerStatus::Hot }
            if deployment == "game-poker-quest"
    )));
}

#[test]
fn reactivation_after_leaving_takes_the_restore_path() {
    let (orch, _) = orchestrator();

    orch.handle("s1", activate("game-grindcraft"));
    orch.handle("s1", deactivate("game-grindcraft"));
    assert_eq!(
        orch.registry().state_of("game-grindcraft"),
        Some(ContainerStatus::Warm)
    );
    assert!(orch.spine().is_previous_hot("game-grindcraft"));

    orch.handle("s1", activate("game-grindcraft"));

    let snapshot = orch.proof().snapshot("game-grindcraft").unwrap();
    assert_eq!(snapshot.activation_path_type, Some(ActivationPathType::Restore));
    assert!(snapshot.cache_hit_indicator);
    assert!(snapshot.restore_start_ts > 0);
    assert!(snapshot.restore_complete_ts > 0);
    assert!(snapshot.restore_latency_ms >= 0);

    let timeline = orch.spine().get_timeline("game-grindcraft").unwrap();
    let phases: Vec<_> = timeline.phases.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![
            ActivationPhase::Activating,
            ActivationPhase::Hot,
            ActivationPhase::Deactivating,
            ActivationPhase::Cooling,
            ActivationPhase::RestoreStart,
            ActivationPhase::RestoreComplete,
        ]
    );
    assert_eq!(timeline.session_id, "s1");
}

#[test]
fn reactivation_after_the_restore_window_is_a_prewarm_hit() {
    let mut config = config();
    config.telemetry.restore_window_ms = 1;
    let orch = Orchestrator::new(config, Arc::new(SimulatedWorkloads::new()), None);

    orch.handle("s1", activate("game-grindcraft"));
    orch.handle("s1", deactivate("game-grindcraft"));
    std::thread::sleep(Duration::from_millis(50));
    orch.handle("s1", activate("game-grindcraft"));

    let snapshot = orch.proof().snapshot("game-grindcraft").unwrap();
    assert_eq!(snapshot.activation_path_type, Some(ActivationPathType::Prewarm));
    assert!(snapshot.cache_hit_indicator);
    assert_eq!(snapshot.restore_start_ts, 0);
    assert!(snapshot.execution_ready_ts > 0);

    let timeline = orch.spine().get_timeline("game-grindcraft").unwrap();
    let phases: Vec<_> = timeline.phases.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases[4..],
        [ActivationPhase::Activating, ActivationPhase::Hot]
    );
}

#[test]
fn force_warm_invalidates_the_open_attempt() {
    let (orch, _) = orchestrator();

    // Enough focus for intent, not enough for warming or a mode change.
    orch.handle("s1", focus("game-poker-quest", 8_000));
    let before = orch.proof().snapshot("game-poker-quest").unwrap();
    assert!(before.intent_ts > 0);

    orch.handle("s1", demo(DemoAction::ForceWarm, "game-poker-quest", 0.0));
    assert_eq!(
        orch.registry().state_of("game-poker-quest"),
        Some(ContainerStatus::Warm)
    );
    let invalidated = orch.proof().snapshot("game-poker-quest").unwrap();
    assert_eq!(invalidated.attempt_id, before.attempt_id);
    assert_eq!(invalidated.prewarm_start_ts, 0);

    orch.handle("s1", activate("game-poker-quest"));
    let fresh = orch.proof().snapshot("game-poker-quest").unwrap();
    assert_ne!(fresh.attempt_id, before.attempt_id);
    assert_eq!(fresh.intent_ts, 0);
    assert_eq!(fresh.activation_path_type, Some(ActivationPathType::Prewarm));
}

#[test]
fn force_cold_is_not_measured() {
    let (orch, _) = orchestrator();
    orch.handle("s1", demo(DemoAction::ForceCold, "game-mrmine", 0.0));

    assert_eq!(
        orch.registry().state_of("game-mrmine"),
        Some(ContainerStatus::Cold)
    );
    assert!(orch.snapshots().is_empty());
    assert!(orch.proof().get_recent_signals(0).is_empty());
}

// ── Rules ──────────────────────────────────────────────────────────

#[test]
fn cross_domain_injection_happens_once_per_session() {
    let (orch, _) = orchestrator();
    let mut rx = orch.hub().subscribe();

    orch.handle("s1", focus("game-mrmine", 6_000));
    orch.handle("s1", focus("game-mrmine", 6_000));
    orch.handle("s2", focus("game-mrmine", 6_000));

    let injects: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ServerEvent::StreamInject {
                content,
                insert_position,
                ..
            } => Some((content.id, insert_position)),
            _ => None,
        })
        .collect();
    assert_eq!(
        injects,
        vec![
            ("ai-service-tech".to_string(), 1),
            ("ai-service-tech".to_string(), 1)
        ]
    );

    let inject_decisions = orch
        .decisions(0)
        .into_iter()
        .filter(|d| d.resulting_action == ActionType::InjectContent)
        .count();
    assert_eq!(inject_decisions, 2);

    let session = orch.session("s1").unwrap();
    assert_eq!(session.injected_content, vec!["ai-service-tech".to_string()]);
    assert_eq!(session.focus_time("tech"), 12_000);
    assert_eq!(session.active_content_id.as_deref(), Some("game-mrmine"));
}

#[test]
fn long_focus_switches_mode_and_throttles() {
    let (orch, workloads) = orchestrator();
    let mut rx = orch.hub().subscribe();

    orch.handle("s1", focus("game-mrmine", 12_000));

    assert_eq!(orch.registry().mode(), OperationalMode::GameFocusMode);
    assert_eq!(
        orch.session("s1").unwrap().current_mode,
        OperationalMode::GameFocusMode
    );
    assert_eq!(
        workloads.throttle_level("game-mrmine"),
        Some(ThrottleLevel::Active)
    );
    assert_eq!(
        workloads.throttle_level("ai-service"),
        Some(ThrottleLevel::Background)
    );

    let actions: Vec<_> = orch
        .decisions(0)
        .iter()
        .map(|d| d.resulting_action)
        .collect();
    assert!(actions.contains(&ActionType::ChangeMode));
    assert!(actions.contains(&ActionType::ThrottleBackground));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::ModeChange {
            old_mode: OperationalMode::MixedStreamBrowsing,
            new_mode: OperationalMode::GameFocusMode,
            ..
        }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::ResourceUpdate(allocation) if allocation.active_allocation == 70.0
    )));

    // Same mode again: no further mode change.
    orch.handle("s1", focus("game-poker-quest", 12_000));
    let mode_changes = orch
        .decisions(0)
        .iter()
        .filter(|d| d.resulting_action == ActionType::ChangeMode)
        .count();
    assert_eq!(mode_changes, 1);

    orch.handle("s1", focus("ai-service-tech", 12_000));
    assert_eq!(orch.registry().mode(), OperationalMode::AiServiceMode);
    assert_eq!(
        workloads.throttle_level("ai-service"),
        Some(ThrottleLevel::Active)
    );
    assert_eq!(
        workloads.throttle_level("game-mrmine"),
        Some(ThrottleLevel::Background)
    );
}

#[test]
fn repeated_focus_warms_proactively() {
    let (orch, _) = orchestrator();

    // personal saturates at 1.0; global climbs 0.12 per event.
    for _ in 0..5 {
        orch.handle("s1", focus("game-fray-fight", 12_000));
    }
    assert_eq!(
        orch.registry().state_of("game-fray-fight"),
        Some(ContainerStatus::Warm)
    );
    let warm = orch
        .decisions(0)
        .into_iter()
        .find(|d| d.resulting_action == ActionType::ScaleWarm)
        .unwrap();
    assert_eq!(warm.trigger_type, TriggerType::ProactiveWarm);
    assert_eq!(warm.affected_content_id, "game-fray-fight");

    let scores = orch.scorer().get_scores("s1", "game-fray-fight");
    assert!(scores.combined >= 0.6);
    let item = orch.registry().get_content_by_id("game-fray-fight").unwrap();
    assert_eq!(item.combined_score, scores.combined);
}

#[test]
fn initial_warm_prepares_the_top_of_the_stream() {
    let (orch, _) = orchestrator();
    let decisions = orch.initial_warm();

    assert_eq!(decisions.len(), 2);
    assert!(decisions
        .iter()
        .all(|d| d.trigger_type == TriggerType::InitialWarm));
    assert_eq!(
        orch.registry().state_of("game-clicker-heroes"),
        Some(ContainerStatus::Warm)
    );
    assert_eq!(
        orch.registry().state_of("game-mrmine"),
        Some(ContainerStatus::Warm)
    );
    assert_eq!(
        orch.registry().state_of("game-poker-quest"),
        Some(ContainerStatus::Cold)
    );
}

#[test]
fn scroll_update_warms_at_most_the_lookahead_limit() {
    let (orch, _) = orchestrator();
    orch.handle(
        "s1",
        ClientEvent::ScrollUpdate {
            position: 640,
            velocity: 1.5,
            visible_content: vec![
                "game-poker-quest".to_string(),
                "game-grindcraft".to_string(),
                "game-fray-fight".to_string(),
            ],
        },
    );

    let warmed: Vec<_> = orch
        .decisions(0)
        .into_iter()
        .rev()
        .map(|d| (d.trigger_type, d.affected_content_id))
        .collect();
    assert_eq!(
        warmed,
        vec![
            (TriggerType::LookaheadWarm, "game-poker-quest".to_string()),
            (TriggerType::LookaheadWarm, "game-grindcraft".to_string()),
        ]
    );

    let session = orch.session("s1").unwrap();
    assert_eq!(session.scroll_position, 640);
    assert_eq!(session.visible_content.len(), 3);
}

#[test]
fn unknown_content_is_ignored() {
    let (orch, workloads) = orchestrator();
    let mut rx = orch.hub().subscribe();

    orch.handle("s1", activate("missing"));
    orch.handle("s1", deactivate("missing"));
    orch.handle("s1", demo(DemoAction::TriggerTrendSpike, "missing", 0.95));

    assert!(orch.decisions(0).is_empty());
    assert!(workloads.calls().is_empty());
    assert!(!drain(&mut rx)
        .iter()
        .any(|e| matches!(e, ServerEvent::ActivationReady { .. })));
}

// ── Reset and mirror ───────────────────────────────────────────────

#[test]
fn reset_clears_the_decision_loop() {
    let (orch, _) = orchestrator();
    orch.handle("s1", focus("game-mrmine", 12_000));
    orch.handle("s1", activate("game-mrmine"));
    assert!(!orch.decisions(0).is_empty());

    orch.handle("s1", demo(DemoAction::ResetDemo, "", 0.0));

    assert!(orch.decisions(0).is_empty());
    assert!(orch.snapshots().is_empty());
    assert!(orch.spine().is_empty());
    assert!(orch.scorer().is_empty());
    assert!(orch.session("s1").is_none());
    assert_eq!(orch.registry().mode(), OperationalMode::MixedStreamBrowsing);
    assert!(orch
        .registry()
        .get_all_content()
        .iter()
        .all(|c| c.container_status == ContainerStatus::Cold));
}

#[test]
fn state_mirror_follows_the_decision_loop() {
    let store = StateStore::open_in_memory().unwrap();
    let orch = Orchestrator::new(
        config(),
        Arc::new(SimulatedWorkloads::new()),
        Some(store.clone()),
    );

    orch.handle(
        "s1",
        demo(DemoAction::TriggerTrendSpike, "game-poker-quest", 0.9),
    );
    orch.handle("s1", focus("game-poker-quest", 3_000));

    let trend = store.get_trend("game-poker-quest").unwrap().unwrap();
    assert_eq!(trend.viral_score, 0.9);
    assert!(trend.manual_override);
    assert!(store
        .get_scores("s1", "game-poker-quest")
        .unwrap()
        .is_some());

    let mirrored = store.list_decisions(0).unwrap();
    assert_eq!(mirrored.len(), orch.decisions(0).len());
    assert_eq!(mirrored[0].decision_id, orch.decisions(1)[0].decision_id);

    orch.reset();
    assert!(store.list_decisions(0).unwrap().is_empty());
    assert!(store.get_trend("game-poker-quest").unwrap().is_none());
}

// ── Simulated start-up ─────────────────────────────────────────────

#[tokio::test]
async fn preview_ready_arrives_after_simulated_startup() {
    let mut config = config();
    config.daemon.simulate_startup_delays = true;
    let orch = Orchestrator::new(config, Arc::new(SimulatedWorkloads::new()), None);
    let mut rx = orch.hub().subscribe();

    orch.handle(
        "s1",
        demo(DemoAction::TriggerTrendSpike, "ai-service-tech", 0.9),
    );
    assert_eq!(
        orch.spine()
            .get_timeline("ai-service-tech")
            .unwrap()
            .latest_phase(),
        Some(ActivationPhase::PreWarm)
    );

    let ready = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(outbound) => {
                    if let ServerEvent::ActivationSpine(event) = outbound.event {
                        if event.phase == ActivationPhase::PreviewReady {
                            return event;
                        }
                    }
                }
                Err(e) => panic!("hub closed: {e}"),
            }
        }
    })
    .await
    .unwrap();

    assert!(ready.is_simulated);
    assert_eq!(ready.trigger_source, "container_ready_simulated");
    assert!(orch.proof().snapshot("ai-service-tech").unwrap().warm_ready_ts > 0);
}
