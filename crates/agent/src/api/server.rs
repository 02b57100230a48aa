use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use super::metrics;
use super::reset;
use super::state::PatrolState;

async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub fn router(state: PatrolState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::metrics))
        .route("/metrics/reset", get(reset::reset))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: PatrolState) -> std::io::Result<()> {
    let app = router(state);
    axum::serve(listener, app).await
}
