//! Scorer — per-session, global, and trend scores with decay.
//!
//! All three score maps sit behind one `RwLock` so a decay tick never
//! exposes a half-updated set. The score-update callback runs after the
//! lock is released.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use pulse_core::{
    system_clock, Clock, ContentId, InputScores, ScorerConfig, SessionId, TrendDirection,
    TrendScore,
};

/// Scores below this are removed by decay.
const REMOVAL_THRESHOLD: f64 = 0.01;

/// Share of a focus event's personal increase that also lands on the
/// global score.
const GLOBAL_SHARE: f64 = 0.1;

/// Callback invoked with the content id and its new scores after every
/// recorded focus event.
pub type ScoreUpdateCallback = Arc<dyn Fn(&str, &InputScores) + Send + Sync>;

/// Outcome of one decay tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecaySummary {
    /// Entries still present after the tick.
    pub retained: usize,
    /// Entries dropped for falling below the removal threshold.
    pub removed: usize,
}

#[derive(Default)]
struct ScoreTables {
    /// session_id → content_id → personal score.
    personal: HashMap<SessionId, HashMap<ContentId, f64>>,
    /// content_id → global score.
    global: HashMap<ContentId, f64>,
    /// content_id → trend score.
    trend: HashMap<ContentId, TrendScore>,
}

impl ScoreTables {
    fn personal(&self, session_id: &str, content_id: &str) -> f64 {
        self.personal
            .get(session_id)
            .and_then(|scores| scores.get(content_id))
            .copied()
            .unwrap_or(0.0)
    }

    fn global(&self, content_id: &str) -> f64 {
        self.global.get(content_id).copied().unwrap_or(0.0)
    }

    fn trend(&self, content_id: &str) -> f64 {
        self.trend
            .get(content_id)
            .map(|t| t.viral_score)
            .unwrap_or(0.0)
    }
}

/// Maintains and blends engagement scores.
pub struct Scorer {
    tables: RwLock<ScoreTables>,
    config: ScorerConfig,
    clock: Clock,
    on_score_update: Option<ScoreUpdateCallback>,
}

impl Scorer {
    /// Create a scorer with the given tuning.
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            tables: RwLock::new(ScoreTables::default()),
            config,
            clock: system_clock(),
            on_score_update: None,
        }
    }

    /// Set the callback fired after each focus event.
    pub fn with_score_update_fn(mut self, f: ScoreUpdateCallback) -> Self {
        self.on_score_update = Some(f);
        self
    }

    /// Replace the clock used to stamp trend updates.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Record a focus event and return the content's new scores.
    ///
    /// Personal state is partitioned by session, so concurrent sessions
    /// never affect each other's personal scores.
    pub fn record_focus_event(
        &self,
        session_id: &str,
        content_id: &str,
        duration_ms: u64,
        theme: &str,
    ) -> InputScores {
        let increase = (duration_ms as f64 / 1000.0) * self.config.focus_duration_scale;

        let scores = {
            let mut tables = self.tables.write().expect("scorer lock");

            let personal = tables
                .personal
                .entry(session_id.to_string())
                .or_default()
                .entry(content_id.to_string())
                .or_insert(0.0);
            *personal = (*personal + increase).min(1.0);
            let personal = *personal;

            let global = tables.global.entry(content_id.to_string()).or_insert(0.0);
            *global = (*global + increase * GLOBAL_SHARE).min(1.0);
            let global = *global;

            let trend = tables.trend(content_id);
            InputScores::new(personal, global, self.combine(personal, global, trend))
        };

        debug!(
            session = %session_id,
            content = %content_id,
            %theme,
            personal = scores.personal,
            global = scores.global,
            combined = scores.combined,
            "score updated"
        );

        if let Some(ref f) = self.on_score_update {
            f(content_id, &scores);
        }

        scores
    }

    /// Overwrite the trend score for a content item as an explicit spike.
    ///
    /// Spiked trends carry `manual_override` and are exempt from decay.
    pub fn set_trend_score(&self, content_id: &str, viral_score: f64, direction: TrendDirection) {
        self.put_trend(content_id, viral_score, direction, true);
        info!(content = %content_id, viral_score, %direction, "trend score set");
    }

    /// Record a passively observed trend score, subject to half-rate decay.
    pub fn observe_trend(&self, content_id: &str, viral_score: f64, direction: TrendDirection) {
        self.put_trend(content_id, viral_score, direction, false);
        debug!(content = %content_id, viral_score, %direction, "trend observed");
    }

    fn put_trend(
        &self,
        content_id: &str,
        viral_score: f64,
        direction: TrendDirection,
        manual_override: bool,
    ) {
        let trend = TrendScore {
            content_id: content_id.to_string(),
            viral_score,
            direction,
            last_updated: (self.clock)(),
            manual_override,
        };
        let mut tables = self.tables.write().expect("scorer lock");
        tables.trend.insert(content_id.to_string(), trend);
    }

    /// Current scores for one content item from a session's point of view.
    pub fn get_scores(&self, session_id: &str, content_id: &str) -> InputScores {
        let tables = self.tables.read().expect("scorer lock");
        self.scores_from(&tables, session_id, content_id)
    }

    /// Scores for every content item known to the session, the global
    /// map, or the trend map.
    pub fn get_all_scores(&self, session_id: &str) -> HashMap<ContentId, InputScores> {
        let tables = self.tables.read().expect("scorer lock");

        let mut ids: HashSet<&ContentId> = tables.global.keys().collect();
        ids.extend(tables.trend.keys());
        if let Some(session) = tables.personal.get(session_id) {
            ids.extend(session.keys());
        }

        ids.into_iter()
            .map(|id| (id.clone(), self.scores_from(&tables, session_id, id)))
            .collect()
    }

    pub fn get_trend_score(&self, content_id: &str) -> Option<TrendScore> {
        let tables = self.tables.read().expect("scorer lock");
        tables.trend.get(content_id).cloned()
    }

    /// Apply one decay tick to every stored score.
    pub fn decay(&self) -> DecaySummary {
        let rate = self.config.decay_rate;
        let mut summary = DecaySummary::default();
        let mut tables = self.tables.write().expect("scorer lock");

        for session in tables.personal.values_mut() {
            decay_map(session, 1.0 - rate, &mut summary);
        }
        tables.personal.retain(|_, session| !session.is_empty());

        decay_map(&mut tables.global, 1.0 - rate, &mut summary);

        tables.trend.retain(|_, trend| {
            if trend.manual_override {
                summary.retained += 1;
                return true;
            }
            trend.viral_score *= 1.0 - rate / 2.0;
            let keep = trend.viral_score >= REMOVAL_THRESHOLD;
            if keep {
                summary.retained += 1;
            } else {
                summary.removed += 1;
            }
            keep
        });

        summary
    }

    /// Clear every score map.
    pub fn reset(&self) {
        let mut tables = self.tables.write().expect("scorer lock");
        *tables = ScoreTables::default();
        info!("scorer reset: all scores cleared");
    }

    /// True when no scores of any kind are stored.
    pub fn is_empty(&self) -> bool {
        let tables = self.tables.read().expect("scorer lock");
        tables.personal.is_empty() && tables.global.is_empty() && tables.trend.is_empty()
    }

    /// Run the decay loop until shutdown signal.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let interval = self.config.decay_interval();
        info!(
            interval_ms = interval.as_millis() as u64,
            decay_rate = self.config.decay_rate,
            "score decay started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let summary = self.decay();
                    debug!(
                        retained = summary.retained,
                        removed = summary.removed,
                        "score decay applied"
                    );
                }
                _ = shutdown.changed() => {
                    info!("score decay shutting down");
                    break;
                }
            }
        }
    }

    fn scores_from(&self, tables: &ScoreTables, session_id: &str, content_id: &str) -> InputScores {
        let personal = tables.personal(session_id, content_id);
        let global = tables.global(content_id);
        let trend = tables.trend(content_id);
        InputScores::new(personal, global, self.combine(personal, global, trend))
    }

    fn combine(&self, personal: f64, global: f64, trend: f64) -> f64 {
        let combined = personal * self.config.personal_weight
            + global * self.config.global_weight
            + trend * self.config.trend_weight;
        combined.clamp(0.0, 1.0)
    }
}

fn decay_map(scores: &mut HashMap<ContentId, f64>, factor: f64, summary: &mut DecaySummary) {
    scores.retain(|_, score| {
        *score *= factor;
        let keep = *score >= REMOVAL_THRESHOLD;
        if keep {
            summary.retained += 1;
        } else {
            summary.removed += 1;
        }
        keep
    });
}
