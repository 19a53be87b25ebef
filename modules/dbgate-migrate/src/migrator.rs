//! Applies pending migration files under a session-scoped advisory lock.
//!
//! The lock, every migration transaction, and the unlock all run on the
//! same `PgConnection`, so the lock is held by exactly one session for the
//! whole apply phase. Two processes pointed at the same database serialize
//! on `pg_advisory_lock`; the second one sees the first one's rows once it
//! gets the lock and applies nothing twice.

use std::collections::HashSet;
use std::path::PathBuf;

use dbgate_common::{Config, MigrateConfig};
use serde::Serialize;
use sqlx::{Connection, Executor, PgConnection};
use tracing::{info, warn};

use crate::error::{MigrateError, Result};
use crate::probe::wait_for_database;
use crate::source::{list_migrations, Migration};
use crate::store::{self, AppliedMigration};

/// Outcome of one `Migrator::run`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Versions applied by this run, in order.
    pub applied: Vec<String>,
    /// Files found on disk that were already recorded.
    pub already_applied: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Migrator {
    dir: PathBuf,
    lock_key: i64,
}

impl Migrator {
    pub fn new(dir: impl Into<PathBuf>, lock_key: i64) -> Self {
        Self {
            dir: dir.into(),
            lock_key,
        }
    }

    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::new(config.dir.clone(), config.lock_key)
    }

    /// Lock, apply every unrecorded file in filename order, unlock.
    ///
    /// The first failing migration aborts the run: its transaction is rolled
    /// back, later files are not attempted, and the lock is still released.
    pub async fn run(&self, conn: &mut PgConnection) -> Result<MigrationReport> {
        self.lock(conn).await?;

        let outcome = self.apply_pending(conn).await;
        let released = self.unlock(conn).await;

        match (outcome, released) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(unlock_err)) => {
                warn!(error = %unlock_err, "Failed to release migration lock after error");
                Err(e)
            }
        }
    }

    /// Applied and pending versions, without taking the lock.
    pub async fn status(&self, conn: &mut PgConnection) -> Result<MigrationStatus> {
        store::ensure_table(conn).await?;
        let applied = store::applied_records(conn).await?;

        let recorded: HashSet<&str> = applied.iter().map(|m| m.version.as_str()).collect();
        let pending = list_migrations(&self.dir)?
            .into_iter()
            .filter(|f| !recorded.contains(f.version.as_str()))
            .map(|f| f.version)
            .collect();

        Ok(MigrationStatus { applied, pending })
    }

    async fn lock(&self, conn: &mut PgConnection) -> Result<()> {
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(self.lock_key)
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::Lock)?;
        Ok(())
    }

    async fn unlock(&self, conn: &mut PgConnection) -> Result<()> {
        let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.lock_key)
            .fetch_one(&mut *conn)
            .await
            .map_err(MigrateError::Lock)?;

        if !released {
            warn!(lock_key = self.lock_key, "Migration lock was not held at release");
        }
        Ok(())
    }

    async fn apply_pending(&self, conn: &mut PgConnection) -> Result<MigrationReport> {
        store::ensure_table(conn).await?;
        let applied = store::applied_versions(conn).await?;

        let files = list_migrations(&self.dir)?;
        if files.is_empty() {
            info!(dir = %self.dir.display(), "No migrations found; skipping.");
            return Ok(MigrationReport::default());
        }

        let mut report = MigrationReport::default();
        for file in files {
            if applied.contains(&file.version) {
                report.already_applied += 1;
                continue;
            }

            let migration = file.load().await?;
            info!(version = %migration.version, "Applying migration");
            apply_one(conn, &migration).await?;
            report.applied.push(migration.version);
        }

        info!(
            applied = report.applied.len(),
            already_applied = report.already_applied,
            "Migrations complete."
        );
        Ok(report)
    }
}

/// Execute the SQL and record the version in one transaction. Dropping the
/// transaction on error rolls both back.
async fn apply_one(conn: &mut PgConnection, migration: &Migration) -> Result<()> {
    let failed = |source| MigrateError::Migration {
        version: migration.version.clone(),
        source,
    };

    let mut tx = conn.begin().await?;

    // Simple-query protocol so multi-statement files run as written.
    // Same as `raw_sql(..).execute(..)`, called via `Executor` directly so
    // the future stays `Send` (rustc higher-ranked lifetime inference bug).
    (&mut *tx)
        .execute(sqlx::raw_sql(&migration.sql))
        .await
        .map_err(failed)?;
    store::record(&mut *tx, &migration.version)
        .await
        .map_err(failed)?;

    tx.commit().await.map_err(failed)?;
    Ok(())
}

/// Wait for the database, then run the migrator on a dedicated connection.
pub async fn run_migrations(config: &Config) -> Result<MigrationReport> {
    let options = config.db.connect_options();
    wait_for_database(&options, config.migrate.wait_attempts, config.migrate.wait_delay).await?;

    let mut conn = PgConnection::connect_with(&options).await?;
    let report = Migrator::from_config(&config.migrate).run(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close migration connection");
    }
    report
}

pub async fn migration_status(config: &Config) -> Result<MigrationStatus> {
    let options = config.db.connect_options();
    wait_for_database(&options, config.migrate.wait_attempts, config.migrate.wait_delay).await?;

    let mut conn = PgConnection::connect_with(&options).await?;
    let status = Migrator::from_config(&config.migrate).status(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close migration connection");
    }
    status
}
