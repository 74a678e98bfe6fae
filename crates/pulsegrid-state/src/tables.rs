//! redb table definitions for the state mirror.

use redb::TableDefinition;

pub const SCORES_TABLE: &str = "scores";
pub const TRENDS_TABLE: &str = "trends";
pub const DECISIONS_TABLE: &str = "decisions";

/// Per-session scores keyed by `{session_id}:{content_id}`.
pub const SCORES: TableDefinition<&str, &[u8]> = TableDefinition::new(SCORES_TABLE);

/// Trend scores keyed by `{content_id}`.
pub const TRENDS: TableDefinition<&str, &[u8]> = TableDefinition::new(TRENDS_TABLE);

/// Decisions keyed by `{timestamp:020}:{decision_id}` so key order is
/// creation order.
pub const DECISIONS: TableDefinition<&str, &[u8]> = TableDefinition::new(DECISIONS_TABLE);

pub fn score_key(session_id: &str, content_id: &str) -> String {
    format!("{session_id}:{content_id}")
}

pub fn decision_key(timestamp: u64, decision_id: &str) -> String {
    format!("{timestamp:020}:{decision_id}")
}
