use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;
use tracing::warn;

use dbgate_migrate::{store, AppliedMigration};

pub struct AppState {
    pub pool: PgPool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/health", get(health))
        .route("/migrations", get(applied_migrations))
        .with_state(state)
        // Logging layer: method + path + status + latency
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, format!("database unavailable: {e}")).into_response()
        }
    }
}

async fn applied_migrations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AppliedMigration>>, (StatusCode, String)> {
    let mut conn = state.pool.acquire().await.map_err(internal)?;
    let rows = store::applied_records(&mut conn).await.map_err(internal)?;
    Ok(Json(rows))
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    warn!(error = %e, "Failed to read applied migrations");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
