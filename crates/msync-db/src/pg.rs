use async_trait::async_trait;
use msync_schemas::{MatchInfo, MatchRecord, MatchState};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::{MatchStore, StoreError};

const SELECT_COLUMNS: &str = r#"
    id, match_id, match_info, state, remote_match_id, finished_at, created_at, updated_at
"#;

/// Postgres-backed `MatchStore`. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgMatchStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

fn decode_row(row: &PgRow) -> Result<MatchRecord, StoreError> {
    let codec = |e: sqlx::Error| StoreError::Codec(e.to_string());

    let state_raw: String = row.try_get("state").map_err(codec)?;
    let state = MatchState::parse(&state_raw)
        .ok_or_else(|| StoreError::Codec(format!("invalid match state: {state_raw}")))?;

    let info_raw: serde_json::Value = row.try_get("match_info").map_err(codec)?;
    let match_info: MatchInfo = serde_json::from_value(info_raw)
        .map_err(|e| StoreError::Codec(format!("match_info: {e}")))?;

    Ok(MatchRecord {
        id: row.try_get("id").map_err(codec)?,
        match_id: row.try_get("match_id").map_err(codec)?,
        match_info,
        state,
        remote_match_id: row.try_get("remote_match_id").map_err(codec)?,
        finished_at: row.try_get("finished_at").map_err(codec)?,
        created_at: row.try_get("created_at").map_err(codec)?,
        updated_at: row.try_get("updated_at").map_err(codec)?,
    })
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn create(&self, record: &MatchRecord) -> Result<Uuid, StoreError> {
        let info = serde_json::to_value(&record.match_info)
            .map_err(|e| StoreError::Codec(format!("match_info: {e}")))?;

        let inserted: Option<Uuid> = self
            .bounded(
                sqlx::query_scalar::<_, Uuid>(
                    r#"
                    insert into matches (
                      id, match_id, match_info, state, remote_match_id, finished_at,
                      created_at, updated_at
                    ) values (
                      $1, $2, $3, $4, $5, $6, $7, $7
                    )
                    on conflict (match_id) do nothing
                    returning id
                    "#,
                )
                .bind(record.id)
                .bind(&record.match_id)
                .bind(info)
                .bind(record.state.as_str())
                .bind(&record.remote_match_id)
                .bind(record.finished_at)
                .bind(record.created_at)
                .fetch_optional(&self.pool),
            )
            .await?;

        inserted.ok_or_else(|| StoreError::Duplicate(record.match_id.clone()))
    }

    async fn update(&self, record: &MatchRecord) -> Result<Uuid, StoreError> {
        // Same merge as MatchRecord::absorb, done in one statement so two
        // writers cannot interleave between read and write.
        let updated: Option<Uuid> = self
            .bounded(
                sqlx::query_scalar::<_, Uuid>(
                    r#"
                    update matches
                    set state = case
                          when array_position(array['NEW','IN_PROGRESS','FINISHED'], $2::text)
                             > array_position(array['NEW','IN_PROGRESS','FINISHED'], state)
                          then $2::text
                          else state
                        end,
                        remote_match_id = coalesce($3, remote_match_id),
                        finished_at = coalesce(finished_at, $4),
                        updated_at = now()
                    where match_id = $1
                    returning id
                    "#,
                )
                .bind(&record.match_id)
                .bind(record.state.as_str())
                .bind(&record.remote_match_id)
                .bind(record.finished_at)
                .fetch_optional(&self.pool),
            )
            .await?;

        updated.ok_or_else(|| StoreError::NotFound(record.match_id.clone()))
    }

    async fn get_by_match_id(&self, match_id: &str) -> Result<MatchRecord, StoreError> {
        let sql = format!("select {SELECT_COLUMNS} from matches where match_id = $1");
        let row = self
            .bounded(
                sqlx::query(&sql)
                    .bind(match_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match row {
            Some(row) => decode_row(&row),
            None => Err(StoreError::NotFound(match_id.to_string())),
        }
    }

    async fn list_all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        let sql = format!("select {SELECT_COLUMNS} from matches order by created_at, match_id");
        let rows = self
            .bounded(sqlx::query(&sql).fetch_all(&self.pool))
            .await?;

        rows.iter().map(decode_row).collect()
    }
}
