//! `RELOAD=1`: re-run the migration sequence on SIGHUP so newly added files
//! are applied without restarting the server.

use dbgate_common::Config;
use dbgate_migrate::run_migrations;
use tracing::{error, info};

#[cfg(unix)]
pub fn spawn_reload_listener(config: Config) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGHUP handler; reload disabled");
                return;
            }
        };

        info!("Reload enabled: send SIGHUP to apply new migrations");
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, re-running migrations");
            match run_migrations(&config).await {
                Ok(report) => info!(
                    applied = report.applied.len(),
                    already_applied = report.already_applied,
                    "Reload complete"
                ),
                Err(e) => error!(error = %e, "Reload migration run failed"),
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_reload_listener(_config: Config) {
    tracing::warn!("RELOAD=1 has no effect on this platform");
}
