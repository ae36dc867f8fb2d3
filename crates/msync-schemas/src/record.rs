use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MatchInfo;

/// Lifecycle of a match on the orchestration side.
///
/// Transitions only move forward: `New -> InProgress -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    New,
    InProgress,
    Finished,
}

impl MatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::New => "NEW",
            MatchState::InProgress => "IN_PROGRESS",
            MatchState::Finished => "FINISHED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(MatchState::New),
            "IN_PROGRESS" => Some(MatchState::InProgress),
            "FINISHED" => Some(MatchState::Finished),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MatchState::New => 0,
            MatchState::InProgress => 1,
            MatchState::Finished => 2,
        }
    }

    /// True for exactly one step forward.
    pub fn can_transition_to(&self, next: MatchState) -> bool {
        next.rank() == self.rank() + 1
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal match state transition {from} -> {to}")]
pub struct TransitionError {
    pub from: MatchState,
    pub to: MatchState,
}

/// Persisted unit of work, one per match id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: Uuid,
    pub match_id: String,
    pub match_info: MatchInfo,
    pub state: MatchState,
    pub remote_match_id: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(match_id: impl Into<String>, match_info: MatchInfo, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id: match_id.into(),
            match_info,
            state: MatchState::New,
            remote_match_id: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn advance(&mut self, to: MatchState, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.updated_at = now;
        Ok(())
    }

    /// `New -> InProgress` after the remote match was created.
    pub fn mark_in_progress(
        &mut self,
        remote_match_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.advance(MatchState::InProgress, now)?;
        self.remote_match_id = Some(remote_match_id.into());
        Ok(())
    }

    /// Record when the match-finished notification arrived.
    ///
    /// The first stamp wins so a redelivered notification does not push the
    /// grace deadline out. Returns false when already stamped.
    pub fn stamp_finished(&mut self, now: DateTime<Utc>) -> bool {
        if self.finished_at.is_some() {
            return false;
        }
        self.finished_at = Some(now);
        self.updated_at = now;
        true
    }

    /// True once `finished_at + grace` lies strictly before `now`.
    pub fn grace_elapsed(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        match self.finished_at {
            Some(at) => at + grace < now,
            None => false,
        }
    }

    /// `InProgress -> Finished` when the grace period has elapsed.
    ///
    /// Returns `Ok(false)` when the record is not due yet.
    pub fn promote_if_expired(
        &mut self,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> Result<bool, TransitionError> {
        if self.state != MatchState::InProgress {
            return Err(TransitionError {
                from: self.state,
                to: MatchState::Finished,
            });
        }
        if !self.grace_elapsed(now, grace) {
            return Ok(false);
        }
        self.advance(MatchState::Finished, now)?;
        Ok(true)
    }

    /// Fold a possibly stale copy of this record into the stored one.
    ///
    /// Two writers race on the same row (ingestion stamps `finished_at`, the
    /// sweep advances `state`), so the merge keeps the furthest state, the
    /// newest remote id and the first finished stamp. Identity, payload and
    /// `created_at` are never overwritten.
    pub fn absorb(&mut self, incoming: &MatchRecord, now: DateTime<Utc>) {
        if incoming.state.rank() > self.state.rank() {
            self.state = incoming.state;
        }
        if incoming.remote_match_id.is_some() {
            self.remote_match_id = incoming.remote_match_id.clone();
        }
        if self.finished_at.is_none() {
            self.finished_at = incoming.finished_at;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_match;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn state_strings_round_trip() {
        for s in [MatchState::New, MatchState::InProgress, MatchState::Finished] {
            assert_eq!(MatchState::parse(s.as_str()), Some(s));
        }
        assert_eq!(MatchState::parse("DELETED"), None);
        assert_eq!(
            serde_json::to_value(MatchState::InProgress).unwrap(),
            serde_json::json!("IN_PROGRESS")
        );
    }

    #[test]
    fn transitions_only_move_one_step_forward() {
        use MatchState::*;
        assert!(New.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Finished));
        assert!(!New.can_transition_to(Finished));
        assert!(!Finished.can_transition_to(New));
        assert!(!InProgress.can_transition_to(New));
        assert!(!Finished.can_transition_to(Finished));
    }

    #[test]
    fn new_record_cannot_skip_to_finished() {
        let mut rec = MatchRecord::new("m1", sample_match(), t0());
        rec.stamp_finished(t0());
        let err = rec
            .promote_if_expired(t0() + Duration::hours(1), Duration::minutes(10))
            .unwrap_err();
        assert_eq!(err.from, MatchState::New);
        assert_eq!(rec.state, MatchState::New);
    }

    #[test]
    fn grace_boundary_is_strict() {
        let mut rec = MatchRecord::new("m1", sample_match(), t0());
        rec.mark_in_progress("r1", t0()).unwrap();
        rec.stamp_finished(t0());
        let grace = Duration::minutes(10);

        assert!(!rec.promote_if_expired(t0() + grace - Duration::seconds(1), grace).unwrap());
        assert!(!rec.promote_if_expired(t0() + grace, grace).unwrap());
        assert_eq!(rec.state, MatchState::InProgress);

        assert!(rec.promote_if_expired(t0() + grace + Duration::seconds(1), grace).unwrap());
        assert_eq!(rec.state, MatchState::Finished);
    }

    #[test]
    fn unstamped_record_never_expires() {
        let mut rec = MatchRecord::new("m1", sample_match(), t0());
        rec.mark_in_progress("r1", t0()).unwrap();
        assert!(!rec
            .promote_if_expired(t0() + Duration::days(365), Duration::zero())
            .unwrap());
    }

    #[test]
    fn absorb_never_moves_backwards() {
        let mut stored = MatchRecord::new("m1", sample_match(), t0());
        stored.mark_in_progress("r1", t0()).unwrap();

        // Stale copy read before the sweep advanced the row, then stamped.
        let mut stale = stored.clone();
        stale.state = MatchState::New;
        stale.remote_match_id = None;
        stale.stamp_finished(t0() + Duration::minutes(1));

        stored.absorb(&stale, t0() + Duration::minutes(2));
        assert_eq!(stored.state, MatchState::InProgress);
        assert_eq!(stored.remote_match_id.as_deref(), Some("r1"));
        assert_eq!(stored.finished_at, Some(t0() + Duration::minutes(1)));
        assert_eq!(stored.updated_at, t0() + Duration::minutes(2));
    }

    #[test]
    fn first_finished_stamp_wins() {
        let mut rec = MatchRecord::new("m1", sample_match(), t0());
        assert!(rec.stamp_finished(t0()));
        assert!(!rec.stamp_finished(t0() + Duration::minutes(5)));
        assert_eq!(rec.finished_at, Some(t0()));
    }
}
