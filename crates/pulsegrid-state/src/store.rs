//! StateStore — redb-backed mirror of scores, trends, and decisions.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns.
//! The decision table is trimmed to the most recent
//! [`DECISION_HISTORY_LIMIT`] entries on every insert.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use pulse_core::{AiDecision, ContentId, InputScores, TrendScore};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Decisions retained in the mirror.
pub const DECISION_HISTORY_LIMIT: usize = 50;

/// Convert any `Display` error into a `StateError` variant via a closure
/// factory, optionally tagged with the table and key involved.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
    ($variant:ident, $table:expr) => {
        |e| StateError::$variant {
            table: $table,
            reason: e.to_string(),
        }
    };
    ($variant:ident, $table:expr, $key:expr) => {
        |e| StateError::$variant {
            table: $table,
            key: $key.to_string(),
            reason: e.to_string(),
        }
    };
}

/// Thread-safe state mirror backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SCORES)
            .map_err(map_err!(Table, SCORES_TABLE))?;
        txn.open_table(TRENDS)
            .map_err(map_err!(Table, TRENDS_TABLE))?;
        txn.open_table(DECISIONS)
            .map_err(map_err!(Table, DECISIONS_TABLE))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Scores ─────────────────────────────────────────────────────

    /// Insert or update one session's scores for a content item.
    pub fn put_scores(
        &self,
        session_id: &str,
        content_id: &str,
        scores: &InputScores,
    ) -> StateResult<()> {
        let key = score_key(session_id, content_id);
        let value = serde_json::to_vec(scores)
            .map_err(map_err!(Encode, SCORES_TABLE, key))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn
                .open_table(SCORES)
                .map_err(map_err!(Table, SCORES_TABLE))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write, SCORES_TABLE, key))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, combined = scores.combined, "scores mirrored");
        Ok(())
    }

    pub fn get_scores(
        &self,
        session_id: &str,
        content_id: &str,
    ) -> StateResult<Option<InputScores>> {
        let key = score_key(session_id, content_id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(SCORES)
            .map_err(map_err!(Table, SCORES_TABLE))?;
        match table
            .get(key.as_str())
            .map_err(map_err!(Read, SCORES_TABLE))?
        {
            Some(guard) => {
                let scores: InputScores = serde_json::from_slice(guard.value())
                    .map_err(map_err!(Corrupt, SCORES_TABLE, key))?;
                Ok(Some(scores))
            }
            None => Ok(None),
        }
    }

    /// All mirrored scores for one session, by content id.
    pub fn list_scores_for_session(
        &self,
        session_id: &str,
    ) -> StateResult<Vec<(ContentId, InputScores)>> {
        let prefix = format!("{session_id}:");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(SCORES)
            .map_err(map_err!(Table, SCORES_TABLE))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read, SCORES_TABLE))? {
            let (key, value) = entry.map_err(map_err!(Read, SCORES_TABLE))?;
            let key = key.value();
            if let Some(content_id) = key.strip_prefix(&prefix) {
                let scores: InputScores = serde_json::from_slice(value.value())
                    .map_err(map_err!(Corrupt, SCORES_TABLE, key))?;
                results.push((content_id.to_string(), scores));
            }
        }
        Ok(results)
    }

    // ── Trends ─────────────────────────────────────────────────────

    pub fn put_trend(&self, trend: &TrendScore) -> StateResult<()> {
        let key = trend.content_id.as_str();
        let value = serde_json::to_vec(trend)
            .map_err(map_err!(Encode, TRENDS_TABLE, key))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn
                .open_table(TRENDS)
                .map_err(map_err!(Table, TRENDS_TABLE))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write, TRENDS_TABLE, key))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(content = %key, viral = trend.viral_score, "trend mirrored");
        Ok(())
    }

    pub fn get_trend(&self, content_id: &str) -> StateResult<Option<TrendScore>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(TRENDS)
            .map_err(map_err!(Table, TRENDS_TABLE))?;
        match table.get(content_id).map_err(map_err!(Read, TRENDS_TABLE))? {
            Some(guard) => {
                let trend: TrendScore = serde_json::from_slice(guard.value())
                    .map_err(map_err!(Corrupt, TRENDS_TABLE, content_id))?;
                Ok(Some(trend))
            }
            None => Ok(None),
        }
    }

    pub fn list_trends(&self) -> StateResult<Vec<TrendScore>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(TRENDS)
            .map_err(map_err!(Table, TRENDS_TABLE))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read, TRENDS_TABLE))? {
            let (key, value) = entry.map_err(map_err!(Read, TRENDS_TABLE))?;
            let trend: TrendScore = serde_json::from_slice(value.value())
                .map_err(map_err!(Corrupt, TRENDS_TABLE, key.value()))?;
            results.push(trend);
        }
        Ok(results)
    }

    // ── Decisions ──────────────────────────────────────────────────

    /// Append a decision and drop everything past the history limit.
    pub fn put_decision(&self, decision: &AiDecision) -> StateResult<()> {
        let key = decision_key(decision.timestamp, &decision.decision_id);
        let value = serde_json::to_vec(decision)
            .map_err(map_err!(Encode, DECISIONS_TABLE, key))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let trimmed;
        {
            let mut table = txn
                .open_table(DECISIONS)
                .map_err(map_err!(Table, DECISIONS_TABLE))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write, DECISIONS_TABLE, key))?;

            let keys: Vec<String> = table
                .iter()
                .map_err(map_err!(Read, DECISIONS_TABLE))?
                .filter_map(|entry| {
                    let (key, _) = entry.ok()?;
                    Some(key.value().to_string())
                })
                .collect();
            let excess = keys.len().saturating_sub(DECISION_HISTORY_LIMIT);
            for old in &keys[..excess] {
                table
                    .remove(old.as_str())
                    .map_err(map_err!(Write, DECISIONS_TABLE, old))?;
            }
            trimmed = excess;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, trimmed, "decision mirrored");
        Ok(())
    }

    /// Most recent decisions first. A limit of 0 returns everything.
    pub fn list_decisions(&self, limit: usize) -> StateResult<Vec<AiDecision>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(DECISIONS)
            .map_err(map_err!(Table, DECISIONS_TABLE))?;
        let mut results = Vec::new();
        for entry in table
            .iter()
            .map_err(map_err!(Read, DECISIONS_TABLE))?
            .rev()
        {
            let (key, value) = entry.map_err(map_err!(Read, DECISIONS_TABLE))?;
            let decision: AiDecision = serde_json::from_slice(value.value())
                .map_err(map_err!(Corrupt, DECISIONS_TABLE, key.value()))?;
            results.push(decision);
            if limit > 0 && results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }

    /// Remove every mirrored score, trend, and decision.
    pub fn clear(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.delete_table(SCORES)
            .map_err(map_err!(Table, SCORES_TABLE))?;
        txn.delete_table(TRENDS)
            .map_err(map_err!(Table, TRENDS_TABLE))?;
        txn.delete_table(DECISIONS)
            .map_err(map_err!(Table, DECISIONS_TABLE))?;
        txn.open_table(SCORES)
            .map_err(map_err!(Table, SCORES_TABLE))?;
        txn.open_table(TRENDS)
            .map_err(map_err!(Table, TRENDS_TABLE))?;
        txn.open_table(DECISIONS)
            .map_err(map_err!(Table, DECISIONS_TABLE))?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!("state store cleared");
        Ok(())
    }
}
