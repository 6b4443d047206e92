// src/db/pool.rs
//
// Postgres pool construction, split out from `main.rs` so tests and the
// binary share one code path (§5 "Database access is pooled").

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
