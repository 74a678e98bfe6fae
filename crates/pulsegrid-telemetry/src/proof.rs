//! Proof signal manager — metric-grade activation checkpoints.
//!
//! One attempt per content item is tracked at a time. A new attempt
//! replaces the current one only after it completes (execution ready or
//! restore complete). Every checkpoint appends a signal to a bounded
//! FIFO ring and pushes a freshly derived [`TelemetrySnapshot`].
//!
//! Callbacks fire after the internal lock is released.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use pulse_core::{
    system_clock, AiDecision, Clock, ContainerStatus, ContentId, TelemetryConfig, TriggerType,
};

/// Longest reasoning kept verbatim on an attempt.
const REASONING_MAX_CHARS: usize = 80;
/// Characters kept before the ellipsis when truncating.
const REASONING_KEEP_CHARS: usize = 77;

static SIGNAL_SEQ: AtomicU64 = AtomicU64::new(0);
static ATTEMPT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofEventType {
    IntentDetected,
    OrchestrationDecisionMade,
    PrewarmStart,
    WarmReady,
    ActivationRequestReceived,
    HotStateEntered,
    ExecutionReady,
    RestoreStart,
    RestoreComplete,
}

impl ProofEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntentDetected => "intent_detected",
            Self::OrchestrationDecisionMade => "orchestration_decision_made",
            Self::PrewarmStart => "prewarm_start",
            Self::WarmReady => "warm_ready",
            Self::ActivationRequestReceived => "activation_request_received",
            Self::HotStateEntered => "hot_state_entered",
            Self::ExecutionReady => "execution_ready",
            Self::RestoreStart => "restore_start",
            Self::RestoreComplete => "restore_complete",
        }
    }
}

impl fmt::Display for ProofEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How content reached activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationPathType {
    #[serde(rename = "COLD_PATH")]
    Cold,
    #[serde(rename = "PREWARM_PATH")]
    Prewarm,
    #[serde(rename = "RESTORE_PATH")]
    Restore,
}

impl ActivationPathType {
    /// RESTORE and PREWARM reuse a ready container.
    pub fn is_cache_hit(&self) -> bool {
        !matches!(self, Self::Cold)
    }
}

/// Immutable, timestamped checkpoint record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofSignalEvent {
    pub event_id: String,
    pub content_id: ContentId,
    pub attempt_id: String,
    pub event_type: ProofEventType,
    pub ts_server_ms: u64,
    pub source_event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<TriggerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_from: Option<ContainerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_to: Option<ContainerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Derived view of one content item's current attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub content_id: ContentId,
    pub attempt_id: String,
    pub current_state: ContainerStatus,
    pub activation_path_type: Option<ActivationPathType>,
    pub cache_hit_indicator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<TriggerType>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_reasoning_short: String,

    // Unix milliseconds, 0 = not yet reached.
    pub intent_ts: u64,
    pub decision_ts: u64,
    pub prewarm_start_ts: u64,
    pub warm_ready_ts: u64,
    pub activation_request_ts: u64,
    pub hot_entered_ts: u64,
    pub execution_ready_ts: u64,
    pub restore_start_ts: u64,
    pub restore_complete_ts: u64,

    // Milliseconds, -1 = an endpoint is missing.
    pub orchestration_decision_time_ms: i64,
    pub prewarm_duration_ms: i64,
    pub activation_latency_ms: i64,
    pub execution_ready_latency_ms: i64,
    pub restore_latency_ms: i64,
}

/// Checkpoint timestamps and classification for one activation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptState {
    pub attempt_id: String,
    pub content_id: ContentId,
    pub completed: bool,
    pub path_type: Option<ActivationPathType>,
    pub cache_hit: bool,
    pub trigger_type: Option<TriggerType>,
    pub reasoning_short: String,
    pub current_state: ContainerStatus,

    pub intent_ts: u64,
    pub decision_ts: u64,
    pub prewarm_start_ts: u64,
    pub warm_ready_ts: u64,
    pub activation_request_ts: u64,
    pub hot_entered_ts: u64,
    pub execution_ready_ts: u64,
    pub restore_start_ts: u64,
    pub restore_complete_ts: u64,
}

impl AttemptState {
    fn new(content_id: &str, now: u64) -> Self {
        let seq = ATTEMPT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            attempt_id: format!("{content_id}-{now}-{seq}"),
            content_id: content_id.to_string(),
            completed: false,
            path_type: None,
            cache_hit: false,
            trigger_type: None,
            reasoning_short: String::new(),
            current_state: ContainerStatus::Cold,
            intent_ts: 0,
            decision_ts: 0,
            prewarm_start_ts: 0,
            warm_ready_ts: 0,
            activation_request_ts: 0,
            hot_entered_ts: 0,
            execution_ready_ts: 0,
            restore_start_ts: 0,
            restore_complete_ts: 0,
        }
    }

    /// Snapshot with latencies derived from the current timestamps.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            content_id: self.content_id.clone(),
            attempt_id: self.attempt_id.clone(),
            current_state: self.current_state,
            activation_path_type: self.path_type,
            cache_hit_indicator: self.cache_hit,
            trigger_type: self.trigger_type,
            last_reasoning_short: self.reasoning_short.clone(),
            intent_ts: self.intent_ts,
            decision_ts: self.decision_ts,
            prewarm_start_ts: self.prewarm_start_ts,
            warm_ready_ts: self.warm_ready_ts,
            activation_request_ts: self.activation_request_ts,
            hot_entered_ts: self.hot_entered_ts,
            execution_ready_ts: self.execution_ready_ts,
            restore_start_ts: self.restore_start_ts,
            restore_complete_ts: self.restore_complete_ts,
            orchestration_decision_time_ms: latency(self.intent_ts, self.decision_ts),
            prewarm_duration_ms: latency(self.prewarm_start_ts, self.warm_ready_ts),
            activation_latency_ms: latency(self.activation_request_ts, self.hot_entered_ts),
            execution_ready_latency_ms: latency(
                self.activation_request_ts,
                self.execution_ready_ts,
            ),
            restore_latency_ms: latency(self.restore_start_ts, self.restore_complete_ts),
        }
    }
}

/// `to - from`, or -1 if either endpoint is unset. Out-of-order stamps
/// yield negative values and are reported as-is.
fn latency(from: u64, to: u64) -> i64 {
    if from == 0 || to == 0 {
        return -1;
    }
    to as i64 - from as i64
}

fn truncate_reasoning(reasoning: &str) -> String {
    if reasoning.chars().count() > REASONING_MAX_CHARS {
        let mut short: String = reasoning.chars().take(REASONING_KEEP_CHARS).collect();
        short.push_str("...");
        short
    } else {
        reasoning.to_string()
    }
}

/// Callback invoked with every raw proof signal.
pub type SignalCallback = Arc<dyn Fn(&ProofSignalEvent) + Send + Sync>;

/// Callback invoked with the recomputed snapshot after every signal.
pub type SnapshotCallback = Arc<dyn Fn(&TelemetrySnapshot) + Send + Sync>;

#[derive(Default)]
struct ProofState {
    /// content_id → current attempt.
    attempts: HashMap<ContentId, AttemptState>,
    /// content_id → last time it left HOT.
    hot_history: HashMap<ContentId, u64>,
    /// content_id → last focus loss.
    focus_loss: HashMap<ContentId, u64>,
    /// Oldest first.
    signals: VecDeque<ProofSignalEvent>,
}

impl ProofState {
    fn attempt_mut(&mut self, content_id: &str, now: u64) -> &mut AttemptState {
        let attempt = self
            .attempts
            .entry(content_id.to_string())
            .or_insert_with(|| AttemptState::new(content_id, now));
        if attempt.completed {
            *attempt = AttemptState::new(content_id, now);
        }
        attempt
    }

    /// The current attempt, only while it is still open.
    fn open_attempt_mut(&mut self, content_id: &str) -> Option<&mut AttemptState> {
        self.attempts
            .get_mut(content_id)
            .filter(|attempt| !attempt.completed)
    }
}

/// A signal staged under the lock, published after it is released.
struct Pending {
    event: ProofSignalEvent,
    snapshot: TelemetrySnapshot,
}

/// Metric-grade attempt tracker.
pub struct ProofSignalManager {
    state: Mutex<ProofState>,
    enabled: bool,
    restore_window_ms: u64,
    max_signals: usize,
    clock: Clock,
    on_signal: Option<SignalCallback>,
    on_snapshot: Option<SnapshotCallback>,
}

impl ProofSignalManager {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            state: Mutex::new(ProofState::default()),
            enabled: config.proof_signals_enabled,
            restore_window_ms: config.restore_window_ms,
            max_signals: config.max_signals,
            clock: system_clock(),
            on_signal: None,
            on_snapshot: None,
        }
    }

    pub fn with_signal_fn(mut self, f: SignalCallback) -> Self {
        self.on_signal = Some(f);
        self
    }

    pub fn with_snapshot_fn(mut self, f: SnapshotCallback) -> Self {
        self.on_snapshot = Some(f);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stamp intent. The first intent of an attempt wins.
    pub fn on_intent_detected(&self, content_id: &str) {
        self.checkpoint(content_id, |state, now| {
            let attempt = state.attempt_mut(content_id, now);
            if attempt.intent_ts != 0 {
                return None;
            }
            attempt.intent_ts = now;
            Some(Signal::new(ProofEventType::IntentDetected, "focus_event"))
        });
    }

    /// Stamp the decision, its trigger, and a short form of its reasoning.
    pub fn on_decision_made(&self, decision: &AiDecision) {
        let content_id = decision.affected_content_id.as_str();
        self.checkpoint(content_id, |state, now| {
            let attempt = state.attempt_mut(content_id, now);
            attempt.decision_ts = now;
            attempt.trigger_type = Some(decision.trigger_type);
            attempt.reasoning_short = truncate_reasoning(&decision.reasoning_text);

            let mut signal =
                Signal::new(ProofEventType::OrchestrationDecisionMade, "decision_made");
            signal.metadata = Some(metadata(json!({
                "trigger_type": decision.trigger_type,
                "action": decision.resulting_action,
            })));
            Some(signal)
        });
    }

    /// Track the container state. Only COLD→WARM (prewarm start) and
    /// any→HOT (hot entered) produce signals.
    pub fn on_container_state_change(
        &self,
        content_id: &str,
        old_state: ContainerStatus,
        new_state: ContainerStatus,
    ) {
        self.checkpoint(content_id, |state, now| {
            let attempt = state.attempt_mut(content_id, now);
            attempt.current_state = new_state;

            let event_type = match (old_state, new_state) {
                (ContainerStatus::Cold, ContainerStatus::Warm) => {
                    attempt.prewarm_start_ts = now;
                    ProofEventType::PrewarmStart
                }
                (_, ContainerStatus::Hot) => {
                    attempt.hot_entered_ts = now;
                    ProofEventType::HotStateEntered
                }
                _ => return None,
            };

            let mut signal = Signal::new(event_type, "container_state_change");
            signal.state_from = Some(old_state);
            signal.state_to = Some(new_state);
            Some(signal)
        });
    }

    /// Stamp warm-ready on an open attempt. Never creates an attempt.
    pub fn on_preview_ready(&self, content_id: &str) {
        self.checkpoint(content_id, |state, now| {
            let attempt = state.open_attempt_mut(content_id)?;
            attempt.warm_ready_ts = now;
            Some(Signal::new(ProofEventType::WarmReady, "preview_ready"))
        });
    }

    /// Stamp the activation request and classify the activation path.
    ///
    /// The path is returned even when signals are disabled.
    pub fn on_activation_request(
        &self,
        content_id: &str,
        current_state: ContainerStatus,
    ) -> ActivationPathType {
        if !self.enabled {
            let state = self.state.lock().expect("proof lock");
            return self.classify(&state, content_id, current_state, (self.clock)());
        }

        let mut classified = ActivationPathType::Cold;
        self.checkpoint(content_id, |state, now| {
            let path = self.classify(state, content_id, current_state, now);
            classified = path;

            let attempt = state.attempt_mut(content_id, now);
            attempt.activation_request_ts = now;
            attempt.path_type = Some(path);
            attempt.cache_hit = path.is_cache_hit();

            let mut signal = Signal::new(
                ProofEventType::ActivationRequestReceived,
                "activation_request",
            );
            signal.metadata = Some(metadata(json!({
                "path_type": path,
                "cache_hit": path.is_cache_hit(),
                "current_state": current_state,
            })));
            Some(signal)
        });
        classified
    }

    /// RESTORE needs both the last HOT exit and the last focus loss
    /// inside the restore window.
    fn classify(
        &self,
        state: &ProofState,
        content_id: &str,
        current_state: ContainerStatus,
        now: u64,
    ) -> ActivationPathType {
        let within_window = |ts: Option<&u64>| {
            ts.is_some_and(|&t| now.saturating_sub(t) < self.restore_window_ms)
        };
        if within_window(state.hot_history.get(content_id))
            && within_window(state.focus_loss.get(content_id))
        {
            ActivationPathType::Restore
        } else if matches!(current_state, ContainerStatus::Warm | ContainerStatus::Hot) {
            ActivationPathType::Prewarm
        } else {
            ActivationPathType::Cold
        }
    }

    /// Stamp execution ready and complete the attempt.
    pub fn on_execution_ready(&self, content_id: &str) {
        self.checkpoint(content_id, |state, now| {
            let attempt = state.open_attempt_mut(content_id)?;
            attempt.execution_ready_ts = now;
            attempt.completed = true;
            Some(Signal::new(ProofEventType::ExecutionReady, "activation_ready"))
        });
    }

    /// Stamp restore start. Forces the RESTORE path.
    pub fn on_restore_start(&self, content_id: &str) {
        self.checkpoint(content_id, |state, now| {
            let attempt = state.attempt_mut(content_id, now);
            attempt.restore_start_ts = now;
            attempt.path_type = Some(ActivationPathType::Restore);
            attempt.cache_hit = true;
            Some(Signal::new(ProofEventType::RestoreStart, "activation_request"))
        });
    }

    /// Stamp restore complete and complete the attempt.
    pub fn on_restore_complete(&self, content_id: &str) {
        self.checkpoint(content_id, |state, now| {
            let attempt = state.open_attempt_mut(content_id)?;
            attempt.restore_complete_ts = now;
            attempt.completed = true;
            Some(Signal::new(ProofEventType::RestoreComplete, "restore_complete"))
        });
    }

    /// Remember when content left HOT and lost focus, for restore
    /// classification of the next attempt. Emits nothing, and records
    /// even when signals are disabled.
    pub fn on_deactivation(&self, content_id: &str) {
        let now = (self.clock)();
        let mut state = self.state.lock().expect("proof lock");
        state.hot_history.insert(content_id.to_string(), now);
        state.focus_loss.insert(content_id.to_string(), now);
    }

    /// Complete the current attempt without stamping anything.
    ///
    /// Applies even when signals are disabled.
    pub fn invalidate_attempt(&self, content_id: &str) {
        let mut state = self.state.lock().expect("proof lock");
        if let Some(attempt) = state.attempts.get_mut(content_id) {
            attempt.completed = true;
        }
    }

    /// Drop all attempts, restore history, and buffered signals.
    pub fn reset(&self) {
        *self.state.lock().expect("proof lock") = ProofState::default();
    }

    /// Snapshot of the current attempt for a content item.
    pub fn snapshot(&self, content_id: &str) -> Option<TelemetrySnapshot> {
        self.state
            .lock()
            .expect("proof lock")
            .attempts
            .get(content_id)
            .map(AttemptState::snapshot)
    }

    pub fn get_all_snapshots(&self) -> HashMap<ContentId, TelemetrySnapshot> {
        self.state
            .lock()
            .expect("proof lock")
            .attempts
            .iter()
            .map(|(id, attempt)| (id.clone(), attempt.snapshot()))
            .collect()
    }

    /// Most recent signals first. A limit of 0 returns everything.
    pub fn get_recent_signals(&self, limit: usize) -> Vec<ProofSignalEvent> {
        let state = self.state.lock().expect("proof lock");
        let take = if limit == 0 { state.signals.len() } else { limit };
        state.signals.iter().rev().take(take).cloned().collect()
    }

    /// Run one checkpoint mutation and publish its signal, if any.
    fn checkpoint<F>(&self, content_id: &str, mutate: F)
    where
        F: FnOnce(&mut ProofState, u64) -> Option<Signal>,
    {
        if !self.enabled {
            return;
        }
        let now = (self.clock)();

        let pending = {
            let mut state = self.state.lock().expect("proof lock");
            mutate(&mut *state, now)
                .and_then(|signal| self.stage(&mut *state, content_id, signal, now))
        };
        let Some(pending) = pending else {
            return;
        };

        debug!(
            content = %pending.event.content_id,
            attempt = %pending.event.attempt_id,
            event = %pending.event.event_type,
            "proof signal"
        );

        if let Some(ref f) = self.on_signal {
            f(&pending.event);
        }
        if let Some(ref f) = self.on_snapshot {
            f(&pending.snapshot);
        }
    }

    fn stage(
        &self,
        state: &mut ProofState,
        content_id: &str,
        signal: Signal,
        now: u64,
    ) -> Option<Pending> {
        let attempt = state.attempts.get(content_id)?;

        let seq = SIGNAL_SEQ.fetch_add(1, Ordering::Relaxed);
        let event = ProofSignalEvent {
            event_id: format!("proof-{now}-{seq}-{}", signal.event_type),
            content_id: attempt.content_id.clone(),
            attempt_id: attempt.attempt_id.clone(),
            event_type: signal.event_type,
            ts_server_ms: now,
            source_event_type: signal.source.to_string(),
            trigger_type: attempt.trigger_type,
            state_from: signal.state_from,
            state_to: signal.state_to,
            metadata: signal.metadata,
        };
        let snapshot = attempt.snapshot();

        while state.signals.len() >= self.max_signals.max(1) {
            state.signals.pop_front();
        }
        state.signals.push_back(event.clone());

        Some(Pending { event, snapshot })
    }
}

/// Description of a signal produced by a checkpoint mutation.
struct Signal {
    event_type: ProofEventType,
    source: &'static str,
    state_from: Option<ContainerStatus>,
    state_to: Option<ContainerStatus>,
    metadata: Option<Map<String, Value>>,
}

impl Signal {
    fn new(event_type: ProofEventType, source: &'static str) -> Self {
        Self {
            event_type,
            source,
            state_from: None,
            state_to: None,
            metadata: None,
        }
    }
}

fn metadata(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{ActionType, InputScores};

    struct Harness {
        manager: ProofSignalManager,
        now: Arc<AtomicU64>,
        signals: Arc<Mutex<Vec<ProofSignalEvent>>>,
        snapshots: Arc<Mutex<Vec<TelemetrySnapshot>>>,
    }

    impl Harness {
        fn new(config: TelemetryConfig) -> Self {
            let now = Arc::new(AtomicU64::new(1_000_000));
            let signals = Arc::new(Mutex::new(Vec::new()));
            let snapshots = Arc::new(Mutex::new(Vec::new()));

            let clock_now = now.clone();
            let signal_sink = signals.clone();
            let snapshot_sink = snapshots.clone();
            let manager = ProofSignalManager::new(&config)
                .with_clock(Arc::new(move || clock_now.load(Ordering::SeqCst)))
                .with_signal_fn(Arc::new(move |e: &ProofSignalEvent| {
                    signal_sink.lock().unwrap().push(e.clone())
                }))
                .with_snapshot_fn(Arc::new(move |s: &TelemetrySnapshot| {
                    snapshot_sink.lock().unwrap().push(s.clone())
                }));

            Self {
                manager,
                now,
                signals,
                snapshots,
            }
        }

        fn advance(&self, ms: u64) {
            self.now.fetch_add(ms, Ordering::SeqCst);
        }

        fn signal_types(&self) -> Vec<ProofEventType> {
            self.signals
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type)
                .collect()
        }

        fn last_snapshot(&self) -> TelemetrySnapshot {
            self.snapshots.lock().unwrap().last().cloned().unwrap()
        }
    }

    fn decision(content_id: &str, reasoning: &str) -> AiDecision {
        AiDecision {
            decision_id: "dec-1".to_string(),
            timestamp: 0,
            trigger_type: TriggerType::ProactiveWarm,
            affected_content_id: content_id.to_string(),
            reasoning_text: reasoning.to_string(),
            input_scores: InputScores::default(),
            resulting_action: ActionType::ScaleWarm,
            success: true,
        }
    }

    #[test]
    fn full_prewarm_attempt_derives_latencies() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_intent_detected("c1");
        h.advance(40);
        m.on_decision_made(&decision("c1", "Proactive warming"));
        h.advance(10);
        m.on_container_state_change("c1", ContainerStatus::Cold, ContainerStatus::Warm);
        h.advance(900);
        m.on_preview_ready("c1");
        h.advance(2_000);
        m.on_activation_request("c1", ContainerStatus::Warm);
        h.advance(30);
        m.on_container_state_change("c1", ContainerStatus::Warm, ContainerStatus::Hot);
        h.advance(20);
        m.on_execution_ready("c1");

        assert_eq!(
            h.signal_types(),
            vec![
                ProofEventType::IntentDetected,
                ProofEventType::OrchestrationDecisionMade,
                ProofEventType::PrewarmStart,
                ProofEventType::WarmReady,
                ProofEventType::ActivationRequestReceived,
                ProofEventType::HotStateEntered,
                ProofEventType::ExecutionReady,
            ]
        );

        let snap = h.last_snapshot();
        assert_eq!(snap.activation_path_type, Some(ActivationPathType::Prewarm));
        assert!(snap.cache_hit_indicator);
        assert_eq!(snap.current_state, ContainerStatus::Hot);
        assert_eq!(snap.trigger_type, Some(TriggerType::ProactiveWarm));
        assert_eq!(snap.orchestration_decision_time_ms, 40);
        assert_eq!(snap.prewarm_duration_ms, 900);
        assert_eq!(snap.activation_latency_ms, 30);
        assert_eq!(snap.execution_ready_latency_ms, 50);
        assert_eq!(snap.restore_latency_ms, -1);

        // Every signal of the attempt shares one attempt id.
        let signals = h.signals.lock().unwrap();
        assert!(signals.iter().all(|e| e.attempt_id == snap.attempt_id));
        assert_eq!(h.snapshots.lock().unwrap().len(), signals.len());
    }

    #[test]
    fn cold_activation_is_not_a_cache_hit() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager.on_activation_request("c1", ContainerStatus::Cold);

        let snap = h.manager.snapshot("c1").unwrap();
        assert_eq!(snap.activation_path_type, Some(ActivationPathType::Cold));
        assert!(!snap.cache_hit_indicator);

        let signal = &h.signals.lock().unwrap()[0];
        let metadata = signal.metadata.as_ref().unwrap();
        assert_eq!(metadata["path_type"], "COLD_PATH");
        assert_eq!(metadata["cache_hit"], false);
        assert_eq!(metadata["current_state"], "COLD");
    }

    #[test]
    fn reactivation_within_window_is_restore() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_activation_request("c1", ContainerStatus::Warm);
        m.on_execution_ready("c1");
        m.on_deactivation("c1");
        h.advance(500);
        m.on_activation_request("c1", ContainerStatus::Warm);

        let snap = m.snapshot("c1").unwrap();
        assert_eq!(snap.activation_path_type, Some(ActivationPathType::Restore));
        assert!(snap.cache_hit_indicator);
    }

    #[test]
    fn reactivation_after_window_falls_back_to_state() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_deactivation("c1");
        h.advance(5_000);
        m.on_activation_request("c1", ContainerStatus::Cold);
        assert_eq!(
            m.snapshot("c1").unwrap().activation_path_type,
            Some(ActivationPathType::Cold)
        );
    }

    #[test]
    fn activation_request_returns_the_classified_path() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        assert_eq!(
            m.on_activation_request("c1", ContainerStatus::Warm),
            ActivationPathType::Prewarm
        );
        m.on_execution_ready("c1");
        m.on_deactivation("c1");
        h.advance(100);
        assert_eq!(
            m.on_activation_request("c1", ContainerStatus::Warm),
            ActivationPathType::Restore
        );
    }

    #[test]
    fn disabled_manager_still_classifies_restores() {
        let h = Harness::new(TelemetryConfig {
            proof_signals_enabled: false,
            restore_window_ms: 1_000,
            ..TelemetryConfig::default()
        });
        let m = &h.manager;

        m.on_deactivation("c1");
        h.advance(200);
        assert_eq!(
            m.on_activation_request("c1", ContainerStatus::Warm),
            ActivationPathType::Restore
        );
        h.advance(1_000);
        assert_eq!(
            m.on_activation_request("c1", ContainerStatus::Warm),
            ActivationPathType::Prewarm
        );
        assert!(h.signals.lock().unwrap().is_empty());
    }

    #[test]
    fn restore_start_forces_restore_path() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_activation_request("c1", ContainerStatus::Cold);
        h.advance(5);
        m.on_restore_start("c1");
        h.advance(250);
        m.on_restore_complete("c1");

        let snap = h.last_snapshot();
        assert_eq!(snap.activation_path_type, Some(ActivationPathType::Restore));
        assert!(snap.cache_hit_indicator);
        assert_eq!(snap.restore_latency_ms, 250);

        let signals = h.signals.lock().unwrap();
        assert_eq!(signals[1].source_event_type, "activation_request");
        assert_eq!(signals[2].source_event_type, "restore_complete");
    }

    #[test]
    fn first_intent_wins() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager.on_intent_detected("c1");
        let first = h.manager.snapshot("c1").unwrap().intent_ts;
        h.advance(100);
        h.manager.on_intent_detected("c1");

        assert_eq!(h.manager.snapshot("c1").unwrap().intent_ts, first);
        assert_eq!(h.signals.lock().unwrap().len(), 1);
    }

    #[test]
    fn completed_attempt_is_replaced() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_intent_detected("c1");
        m.on_activation_request("c1", ContainerStatus::Warm);
        m.on_execution_ready("c1");
        let first = m.snapshot("c1").unwrap();

        h.advance(1);
        m.on_intent_detected("c1");
        let second = m.snapshot("c1").unwrap();
        assert_ne!(first.attempt_id, second.attempt_id);
        assert_eq!(second.activation_request_ts, 0);
        assert_eq!(second.execution_ready_latency_ms, -1);
    }

    #[test]
    fn lookup_only_checkpoints_never_create_attempts() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_preview_ready("c1");
        m.on_execution_ready("c1");
        m.on_restore_complete("c1");
        assert!(m.get_all_snapshots().is_empty());
        assert!(h.signals.lock().unwrap().is_empty());

        // Nor do they touch a completed attempt.
        m.on_activation_request("c1", ContainerStatus::Warm);
        m.on_execution_ready("c1");
        m.on_execution_ready("c1");
        m.on_preview_ready("c1");
        assert_eq!(h.signals.lock().unwrap().len(), 2);
    }

    #[test]
    fn untracked_transitions_emit_nothing() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager
            .on_container_state_change("c1", ContainerStatus::Hot, ContainerStatus::Warm);
        h.manager
            .on_container_state_change("c1", ContainerStatus::Warm, ContainerStatus::Cold);

        assert!(h.signals.lock().unwrap().is_empty());
        let snap = h.manager.snapshot("c1").unwrap();
        assert_eq!(snap.current_state, ContainerStatus::Cold);
    }

    #[test]
    fn state_change_signals_carry_transition() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager
            .on_container_state_change("c1", ContainerStatus::Cold, ContainerStatus::Hot);

        let signal = &h.signals.lock().unwrap()[0];
        assert_eq!(signal.event_type, ProofEventType::HotStateEntered);
        assert_eq!(signal.state_from, Some(ContainerStatus::Cold));
        assert_eq!(signal.state_to, Some(ContainerStatus::Hot));
        assert_eq!(signal.source_event_type, "container_state_change");
    }

    #[test]
    fn latencies_are_minus_one_until_both_ends_exist() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager.on_intent_detected("c1");

        let snap = h.manager.snapshot("c1").unwrap();
        assert_eq!(snap.orchestration_decision_time_ms, -1);
        assert_eq!(snap.prewarm_duration_ms, -1);
        assert_eq!(snap.activation_latency_ms, -1);
        assert_eq!(snap.execution_ready_latency_ms, -1);
        assert_eq!(snap.restore_latency_ms, -1);
    }

    #[test]
    fn out_of_order_latency_is_not_clamped() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager.on_decision_made(&decision("c1", "x"));
        h.advance(100);
        h.manager.on_intent_detected("c1");

        let snap = h.manager.snapshot("c1").unwrap();
        assert_eq!(snap.orchestration_decision_time_ms, -100);
    }

    #[test]
    fn long_reasoning_is_truncated() {
        let h = Harness::new(TelemetryConfig::default());
        let long = "a".repeat(81);
        h.manager.on_decision_made(&decision("c1", &long));

        let short = h.manager.snapshot("c1").unwrap().last_reasoning_short;
        assert_eq!(short.chars().count(), 80);
        assert!(short.ends_with("..."));

        let exact = "b".repeat(80);
        h.manager.on_decision_made(&decision("c2", &exact));
        assert_eq!(h.manager.snapshot("c2").unwrap().last_reasoning_short, exact);
    }

    #[test]
    fn decision_signal_metadata() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager.on_decision_made(&decision("c1", "x"));

        let signal = &h.signals.lock().unwrap()[0];
        assert_eq!(signal.trigger_type, Some(TriggerType::ProactiveWarm));
        let metadata = signal.metadata.as_ref().unwrap();
        assert_eq!(metadata["trigger_type"], "PROACTIVE_WARM");
        assert_eq!(metadata["action"], "SCALE_WARM");
    }

    #[test]
    fn ring_keeps_most_recent_signals() {
        let h = Harness::new(TelemetryConfig::default());
        for i in 0..250 {
            h.manager.on_intent_detected(&format!("c{i}"));
        }

        let recent = h.manager.get_recent_signals(0);
        assert_eq!(recent.len(), 200);
        assert_eq!(recent[0].content_id, "c249");
        assert_eq!(recent[199].content_id, "c50");

        let top = h.manager.get_recent_signals(3);
        let ids: Vec<_> = top.iter().map(|e| e.content_id.as_str()).collect();
        assert_eq!(ids, vec!["c249", "c248", "c247"]);
    }

    #[test]
    fn ring_capacity_is_configurable() {
        let h = Harness::new(TelemetryConfig {
            max_signals: 5,
            ..TelemetryConfig::default()
        });
        for i in 0..8 {
            h.manager.on_intent_detected(&format!("c{i}"));
        }
        assert_eq!(h.manager.get_recent_signals(100).len(), 5);
    }

    #[test]
    fn disabled_manager_is_inert() {
        let h = Harness::new(TelemetryConfig {
            proof_signals_enabled: false,
            ..TelemetryConfig::default()
        });
        let m = &h.manager;

        m.on_intent_detected("c1");
        m.on_decision_made(&decision("c1", "x"));
        m.on_container_state_change("c1", ContainerStatus::Cold, ContainerStatus::Warm);
        m.on_activation_request("c1", ContainerStatus::Warm);
        m.on_restore_start("c1");
        m.on_deactivation("c1");

        assert!(!m.is_enabled());
        assert!(m.get_all_snapshots().is_empty());
        assert!(m.get_recent_signals(0).is_empty());
        assert!(h.signals.lock().unwrap().is_empty());
        assert!(h.snapshots.lock().unwrap().is_empty());
    }

    #[test]
    fn invalidate_completes_without_stamping() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_intent_detected("c1");
        let before = m.snapshot("c1").unwrap();
        m.invalidate_attempt("c1");
        assert_eq!(m.snapshot("c1").unwrap(), before);
        assert_eq!(h.signals.lock().unwrap().len(), 1);

        // The next checkpoint opens a fresh attempt.
        m.on_intent_detected("c1");
        assert_ne!(m.snapshot("c1").unwrap().attempt_id, before.attempt_id);
    }

    #[test]
    fn reset_matches_fresh_manager() {
        let h = Harness::new(TelemetryConfig::default());
        let m = &h.manager;

        m.on_intent_detected("c1");
        m.on_deactivation("c1");
        m.reset();

        assert!(m.get_all_snapshots().is_empty());
        assert!(m.get_recent_signals(0).is_empty());

        // Restore history was dropped too.
        m.on_activation_request("c1", ContainerStatus::Cold);
        assert_eq!(
            m.snapshot("c1").unwrap().activation_path_type,
            Some(ActivationPathType::Cold)
        );
    }

    #[test]
    fn snapshot_serializes_wire_names() {
        let h = Harness::new(TelemetryConfig::default());
        h.manager.on_activation_request("c1", ContainerStatus::Hot);

        let json = serde_json::to_value(h.manager.snapshot("c1").unwrap()).unwrap();
        assert_eq!(json["activation_path_type"], "PREWARM_PATH");
        assert_eq!(json["current_state"], "COLD");
        assert_eq!(json["restore_latency_ms"], -1);

        let signal = serde_json::to_value(&h.signals.lock().unwrap()[0]).unwrap();
        assert_eq!(signal["event_type"], "activation_request_received");
        assert!(signal.get("state_from").is_none());
    }
}
