use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::state::PatrolState;

#[derive(Debug, Deserialize)]
pub struct ResetParams {
    pub metric: String,
    pub label: String,
}

/// Metric-reset collaborator endpoint: clears the exploding-label gauge
/// entry for one (metric, label) pair after it has been remediated.
pub async fn reset(State(state): State<PatrolState>, Query(params): Query<ResetParams>) -> StatusCode {
    if state.reset_exploding(&params.metric, &params.label) {
        tracing::info!(
            metric = %params.metric,
            label = %params.label,
            "exploding-label gauge entry reset"
        );
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}
