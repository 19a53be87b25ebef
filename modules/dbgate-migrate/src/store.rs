// Bookkeeping table queries. Callers own the connection and any transaction.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::Result;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// A row from the schema_migrations table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: String,
    pub applied_at: DateTime<Utc>,
}

pub async fn ensure_table(conn: &mut PgConnection) -> Result<()> {
    sqlx::query(CREATE_TABLE_SQL).execute(&mut *conn).await?;
    Ok(())
}

pub async fn applied_versions(conn: &mut PgConnection) -> Result<HashSet<String>> {
    let rows = sqlx::query_scalar::<_, String>("SELECT version FROM schema_migrations")
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().collect())
}

pub async fn applied_records(conn: &mut PgConnection) -> Result<Vec<AppliedMigration>> {
    let rows = sqlx::query_as::<_, AppliedMigration>(
        r#"
        SELECT version, applied_at
        FROM schema_migrations
        ORDER BY applied_at ASC, version ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Insert a version row. Must run inside the transaction that executed the
/// migration's SQL.
pub(crate) async fn record(
    conn: &mut PgConnection,
    version: &str,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
        .bind(version)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
