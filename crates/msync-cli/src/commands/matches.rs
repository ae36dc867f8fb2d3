//! `msync matches list`: operator view of the match table.

use anyhow::{Context, Result};
use msync_db::MatchStore;
use msync_schemas::{MatchRecord, MatchState};

/// Parse a `--state` value; case-insensitive, `-` accepted for `_`.
pub fn parse_state(raw: &str) -> Result<MatchState> {
    let norm = raw.trim().to_uppercase().replace('-', "_");
    MatchState::parse(&norm).with_context(|| {
        format!("invalid --state '{raw}'. expected one of: NEW | IN_PROGRESS | FINISHED")
    })
}

/// One `key=value` line per record.
pub fn format_record(r: &MatchRecord) -> String {
    format!(
        "match_id={} state={} remote_match_id={} finished_at={} updated_at={}",
        r.match_id,
        r.state,
        r.remote_match_id.as_deref().unwrap_or("-"),
        r.finished_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string()),
        r.updated_at.to_rfc3339(),
    )
}

pub async fn list(store: &dyn MatchStore, state: Option<MatchState>) -> Result<Vec<String>> {
    let records = store.list_all().await.context("list matches failed")?;
    Ok(records
        .iter()
        .filter(|r| state.map_or(true, |s| r.state == s))
        .map(format_record)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msync_db::MemoryMatchStore;
    use msync_schemas::sample_match;

    #[test]
    fn state_flag_is_forgiving() {
        assert_eq!(parse_state("in-progress").unwrap(), MatchState::InProgress);
        assert_eq!(parse_state(" new ").unwrap(), MatchState::New);
        assert!(parse_state("deleted").is_err());
    }

    #[tokio::test]
    async fn list_filters_by_state() {
        let store = MemoryMatchStore::new();
        let now = chrono::Utc::now();
        let mut a = MatchRecord::new("a", sample_match(), now);
        store.create(&a).await.unwrap();
        store
            .create(&MatchRecord::new("b", sample_match(), now))
            .await
            .unwrap();
        a.mark_in_progress("r-a", now).unwrap();
        store.update(&a).await.unwrap();

        let all = list(&store, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let running = list(&store, Some(MatchState::InProgress)).await.unwrap();
        assert_eq!(running.len(), 1);
        assert!(running[0].starts_with("match_id=a state=IN_PROGRESS remote_match_id=r-a"));
        assert!(running[0].contains("finished_at=-"));
    }
}
