//! Startup gate: block until Postgres answers a trivial query.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info};

use crate::error::{MigrateError, Result};

/// Try `SELECT 1` up to `attempts` times, sleeping a constant `delay` between
/// failures. Returns the last connection error once the budget is spent.
pub async fn wait_for_database(
    options: &PgConnectOptions,
    attempts: u32,
    delay: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    info!(attempts, ?delay, "Waiting for DB...");

    let mut attempt = 1;
    loop {
        match ping(options).await {
            Ok(()) => {
                debug!(attempt, "DB reachable");
                return Ok(());
            }
            Err(source) if attempt >= attempts => {
                return Err(MigrateError::ConnectivityExhausted { attempts, source });
            }
            Err(e) => {
                debug!(attempt, error = %e, "DB not reachable yet");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn ping(options: &PgConnectOptions) -> std::result::Result<(), sqlx::Error> {
    let mut conn = PgConnection::connect_with(options).await?;
    sqlx::query("SELECT 1").execute(&mut conn).await?;
    conn.close().await
}
