// Recent match results feeding the lifetime score.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::PlayerId;
use crate::store::{load_json, persist, KeyValueStore, RECENT_MATCHES_KEY};

/// Number of records kept in history.
pub const RECENT_MATCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchOutcome::Win => "win",
            MatchOutcome::Draw => "draw",
            MatchOutcome::Loss => "loss",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("opponent name must not be empty")]
    MissingOpponent,
    #[error("a lost match cannot award points")]
    PointsOnLoss,
}

/// One finished match as recorded against the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub opponent: String,
    pub outcome: MatchOutcome,
    /// Points added to the lifetime score.
    pub points: u64,
    pub played_at: DateTime<Utc>,
    /// Captain fielded for the match, if any.
    #[serde(default)]
    pub captain: Option<PlayerId>,
}

impl MatchRecord {
    pub fn new(opponent: &str, outcome: MatchOutcome, points: u64) -> Self {
        MatchRecord {
            opponent: opponent.trim().to_string(),
            outcome,
            points,
            played_at: Utc::now(),
            captain: None,
        }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.opponent.trim().is_empty() {
            return Err(MatchError::MissingOpponent);
        }
        if self.outcome == MatchOutcome::Loss && self.points > 0 {
            return Err(MatchError::PointsOnLoss);
        }
        Ok(())
    }
}

/// Newest-first match history, bounded to `RECENT_MATCH_LIMIT`.
pub struct MatchHistory {
    store: Arc<dyn KeyValueStore>,
    recent: Vec<MatchRecord>,
}

impl MatchHistory {
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let mut recent: Vec<MatchRecord> =
            load_json(store.as_ref(), RECENT_MATCHES_KEY).unwrap_or_default();
        recent.retain(|r| r.validate().is_ok());
        recent.truncate(RECENT_MATCH_LIMIT);
        MatchHistory { store, recent }
    }

    pub fn recent(&self) -> &[MatchRecord] {
        &self.recent
    }

    /// Validate and prepend `record`, dropping the oldest beyond the limit.
    pub fn push(&mut self, record: MatchRecord) -> Result<(), MatchError> {
        record.validate()?;
        self.recent.insert(0, record);
        self.recent.truncate(RECENT_MATCH_LIMIT);
        persist(self.store.as_ref(), RECENT_MATCHES_KEY, &self.recent);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.recent.clear();
        persist(self.store.as_ref(), RECENT_MATCHES_KEY, &self.recent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn push_keeps_newest_first() {
        let mut history = MatchHistory::restore(Arc::new(MemoryStore::new()));
        history.push(MatchRecord::new("Alpha", MatchOutcome::Win, 3)).unwrap();
        history.push(MatchRecord::new("Beta", MatchOutcome::Draw, 1)).unwrap();
        let names: Vec<&str> = history.recent().iter().map(|r| r.opponent.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Alpha"]);
    }

    #[test]
    fn history_is_bounded() {
        let mut history = MatchHistory::restore(Arc::new(MemoryStore::new()));
        for i in 0..(RECENT_MATCH_LIMIT + 5) {
            history
                .push(MatchRecord::new(&format!("opp{i}"), MatchOutcome::Win, 1))
                .unwrap();
        }
        assert_eq!(history.recent().len(), RECENT_MATCH_LIMIT);
        assert_eq!(history.recent()[0].opponent, format!("opp{}", RECENT_MATCH_LIMIT + 4));
    }

    #[test]
    fn invalid_records_rejected() {
        let mut history = MatchHistory::restore(Arc::new(MemoryStore::new()));
        assert_eq!(
            history.push(MatchRecord::new("  ", MatchOutcome::Win, 1)),
            Err(MatchError::MissingOpponent)
        );
        assert_eq!(
            history.push(MatchRecord::new("Gamma", MatchOutcome::Loss, 2)),
            Err(MatchError::PointsOnLoss)
        );
        assert!(history.recent().is_empty());
    }

    #[test]
    fn restore_round_trips_and_drops_invalid_entries() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut history = MatchHistory::restore(store.clone());
            let mut record = MatchRecord::new("Delta", MatchOutcome::Draw, 1);
            record.captain = Some(PlayerId::new("navara"));
            history.push(record).unwrap();
        }
        let history = MatchHistory::restore(store.clone());
        assert_eq!(history.recent().len(), 1);
        assert_eq!(
            history.recent()[0].captain,
            Some(PlayerId::new("navara"))
        );

        store
            .set(
                RECENT_MATCHES_KEY,
                r#"[{"opponent":"","outcome":"win","points":1,"played_at":"2026-01-01T00:00:00Z"}]"#,
            )
            .unwrap();
        assert!(MatchHistory::restore(store).recent().is_empty());
    }

    #[test]
    fn unknown_outcome_discards_blob() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                RECENT_MATCHES_KEY,
                r#"[{"opponent":"x","outcome":"forfeit","points":1,"played_at":"2026-01-01T00:00:00Z"}]"#,
            )
            .unwrap();
        assert!(MatchHistory::restore(store).recent().is_empty());
    }
}
