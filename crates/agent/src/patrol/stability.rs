use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::StabilitySettings;
use crate::prom::{PromClient, PromError};

/// Result of a stability search: the last value set computed, whether two
/// consecutive attempts agreed, and how many attempts were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityOutcome {
    pub values: BTreeSet<String>,
    pub stabilized: bool,
    pub attempts: u32,
}

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Checks whether a label's value set is naturally bounded by walking a
/// fixed-width historical window backwards in time.
///
/// Starting from the live value set, each attempt lists the series for
/// `metric` over a window slid one step further into the past and collects
/// the distinct values of `label`. The search stops as soon as two
/// consecutive sets are identical (the values have stabilized) or once
/// `max_attempts` is exhausted; the last computed set is returned either way.
pub async fn find_stable_values(
    prom: &PromClient,
    metric: &str,
    label: &str,
    live_values: BTreeSet<String>,
    settings: &StabilitySettings,
    now_unix: i64,
) -> Result<StabilityOutcome, PromError> {
    let window = settings.window_seconds as i64;
    let step = settings.step_back_seconds as i64;
    let mut end = now_unix - step;
    let mut start = end - window;

    let mut current = live_values;
    let mut attempts = 0;

    while attempts < settings.max_attempts {
        attempts += 1;

        let series = prom.series(metric, Some((start, end))).await?;
        let earlier: BTreeSet<String> = series
            .iter()
            .filter_map(|labels| labels.get(label).cloned())
            .collect();

        let stabilized = earlier == current;
        current = earlier;
        if stabilized {
            tracing::debug!(
                metric = %metric,
                label = %label,
                attempts,
                values = current.len(),
                "label values stabilized"
            );
            return Ok(StabilityOutcome {
                values: current,
                stabilized: true,
                attempts,
            });
        }

        end = start + (window - step);
        start = end - window;
    }

    tracing::debug!(
        metric = %metric,
        label = %label,
        attempts,
        "label values did not stabilize before the attempt limit"
    );
    Ok(StabilityOutcome {
        values: current,
        stabilized: false,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::State;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn settings(max_attempts: u32) -> StabilitySettings {
        StabilitySettings {
            enabled: true,
            max_attempts,
            window_seconds: 600,
            step_back_seconds: 30,
        }
    }

    fn to_set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn series_body(values: &[String]) -> Value {
        let data: Vec<Value> = values
            .iter()
            .map(|v| json!({"__name__": "http_requests_total", "user_id": v}))
            .collect();
        json!({"status": "success", "data": data})
    }

    /// Serves /api/v1/series; `varying` makes every call return a fresh
    /// single-element value set.
    async fn spawn_stub(fixed: Vec<String>, varying: bool) -> String {
        let calls = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/api/v1/series",
                get(move |State(calls): State<Arc<AtomicU32>>| async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if varying {
                        Json(series_body(&[format!("v{n}")]))
                    } else {
                        Json(series_body(&fixed))
                    }
                }),
            )
            .with_state(calls);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn client(base: &str) -> PromClient {
        PromClient::new(base, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn stabilizes_immediately_when_history_matches_live_values() {
        let base = spawn_stub(vec!["a".into(), "b".into()], false).await;
        let prom = client(&base).await;

        let outcome = find_stable_values(
            &prom,
            "http_requests_total",
            "user_id",
            to_set(&["a", "b"]),
            &settings(100),
            1_700_000_000,
        )
        .await
        .unwrap();

        assert!(outcome.stabilized);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.values, to_set(&["a", "b"]));
    }

    #[tokio::test]
    async fn early_return_matches_the_previous_attempt() {
        // The live set disagrees with history, but history itself is
        // constant, so attempts one and two agree.
        let base = spawn_stub(vec!["a".into(), "b".into()], false).await;
        let prom = client(&base).await;

        let outcome = find_stable_values(
            &prom,
            "http_requests_total",
            "user_id",
            to_set(&["a", "b", "c", "d"]),
            &settings(100),
            1_700_000_000,
        )
        .await
        .unwrap();

        assert!(outcome.stabilized);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.values, to_set(&["a", "b"]));
    }

    #[tokio::test]
    async fn terminates_at_the_attempt_bound() {
        let base = spawn_stub(Vec::new(), true).await;
        let prom = client(&base).await;

        let outcome = find_stable_values(
            &prom,
            "http_requests_total",
            "user_id",
            to_set(&["seed"]),
            &settings(4),
            1_700_000_000,
        )
        .await
        .unwrap();

        assert!(!outcome.stabilized);
        assert_eq!(outcome.attempts, 4);
        // The bound was hit, so the returned set is simply the last one seen.
        assert_eq!(outcome.values, to_set(&["v3"]));
    }
}
