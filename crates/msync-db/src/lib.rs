//! msync-db
//!
//! Match record persistence: the `MatchStore` port plus a Postgres and an
//! in-memory implementation. Pool/migration helpers return `anyhow` like
//! the rest of the startup path; store calls return `StoreError`.

mod error;
mod pg;
mod store;

pub use error::{BoxError, StoreError};
pub use pg::PgMatchStore;
pub use store::{MatchStore, MemoryMatchStore};

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "DATABASE_URL";

/// Connect to Postgres.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Connect using `DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_matches_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='matches'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_matches_table: exists,
    })
}

/// Row count per state, for operator output. Empty when not migrated yet.
pub async fn count_by_state(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    if !status(pool).await?.has_matches_table {
        return Ok(Vec::new());
    }

    let rows: Vec<(String, i64)> = sqlx::query_as::<_, (String, i64)>(
        r#"
        select state, count(*)::bigint
        from matches
        group by state
        order by state
        "#,
    )
    .fetch_all(pool)
    .await
    .context("count_by_state failed")?;

    Ok(rows)
}
