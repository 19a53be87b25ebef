//! Test utilities for spinning up a real Postgres instance via testcontainers.

use std::time::Duration;

use dbgate_common::DbConfig;
use sqlx::{Connection, PgConnection};
use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::probe::wait_for_database;

/// Spin up a Postgres container and return the container handle + its connection config.
///
/// The container is dropped (and stopped) when `ContainerAsync` goes out of scope,
/// so callers must hold it alive for the duration of the test.
pub async fn postgres_container() -> (ContainerAsync<GenericImage>, DbConfig) {
    let image = GenericImage::new("postgres", "16-alpine")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_USER", "dbgate")
        .with_env_var("POSTGRES_PASSWORD", "test")
        .with_env_var("POSTGRES_DB", "dbgate");

    let container: ContainerAsync<GenericImage> = image
        .start()
        .await
        .expect("Failed to start Postgres container");

    let host_port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get Postgres host port");

    let db = DbConfig {
        host: "127.0.0.1".to_string(),
        port: host_port,
        name: "dbgate".to_string(),
        user: "dbgate".to_string(),
        password: "test".to_string(),
    };

    // The image logs "ready" once during init and again after its restart.
    wait_for_database(&db.connect_options(), 30, Duration::from_millis(500))
        .await
        .expect("Postgres never became reachable");

    (container, db)
}

pub async fn connect(db: &DbConfig) -> PgConnection {
    PgConnection::connect_with(&db.connect_options())
        .await
        .expect("Failed to connect to Postgres")
}
