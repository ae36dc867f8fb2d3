//! msync-schemas
//!
//! Shared data shapes for the match sync service:
//! - `MatchInfo` / `Team`: the match-service payload carried inside broker events
//! - `EventEnvelope` / `Notification`: the broker message and its decoded sub-type
//! - `MatchState` / `MatchRecord`: the persisted unit of work and its lifecycle
//!
//! No IO lives here.

mod envelope;
mod match_info;
mod record;

pub use envelope::{EventEnvelope, Notification};
pub use match_info::{sample_match, MatchIdSource, MatchInfo, Team};
pub use record::{MatchRecord, MatchState, TransitionError};
