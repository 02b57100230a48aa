use std::collections::{BTreeSet, HashMap, HashSet};

use crate::api::PatrolState;
use crate::config::{PatrolSettings, StabilitySettings};
use crate::prom::{PromClient, PromError, SeriesLabels, VectorSample};
use crate::relabel::HighCardSeries;

use super::stability::{find_stable_values, now_unix};

/// Finds metrics whose cardinality is growing abnormally and narrows each
/// one down to the label responsible.
pub struct CardinalityDetector {
    prom: PromClient,
    state: PatrolState,
    top_n: u32,
    threshold: f64,
    cardinality_metric: String,
    stability: StabilitySettings,
}

impl CardinalityDetector {
    pub fn new(prom: PromClient, state: PatrolState, settings: &PatrolSettings) -> Self {
        Self {
            prom,
            state,
            top_n: settings.top_n,
            threshold: settings.threshold,
            cardinality_metric: settings.cardinality_metric.clone(),
            stability: settings.stability.clone(),
        }
    }

    /// One detection pass. Ranks growth-rate leaders, filters them by the
    /// configured threshold, and picks the exploding label for each survivor
    /// from its live series.
    pub async fn detect(&self) -> Result<Vec<HighCardSeries>, PromError> {
        let expr = format!(
            "topk({},delta({}[1m]))",
            self.top_n, self.cardinality_metric
        );
        let reply = self.prom.instant_query(&expr).await?;
        let candidates = over_threshold(&reply.data.result, self.threshold)?;

        let mut out = Vec::new();
        for metric in candidates {
            let series = self.prom.series(&metric, None).await?;
            let tracker = track_label_values(&series);
            let Some((label, distinct)) = winning_label(&tracker) else {
                tracing::debug!(metric = %metric, "no live series to inspect, skipping");
                continue;
            };

            if self.stability.enabled {
                let live: BTreeSet<String> = tracker[&label].iter().cloned().collect();
                let outcome =
                    find_stable_values(&self.prom, &metric, &label, live, &self.stability, now_unix())
                        .await?;
                if outcome.stabilized {
                    tracing::info!(
                        metric = %metric,
                        label = %label,
                        attempts = outcome.attempts,
                        values = outcome.values.len(),
                        "label value set is bounded, not silencing"
                    );
                    continue;
                }
            }

            tracing::info!(
                metric = %metric,
                label = %label,
                distinct,
                "exploding label detected"
            );
            self.state.set_exploding(&metric, &label, distinct as u64);
            out.push(HighCardSeries {
                metric_name: metric,
                label_name: label,
            });
        }
        Ok(out)
    }
}

/// Applies the threshold to the over-fetched ranking result, keeping the
/// backend's ordering.
fn over_threshold(result: &[VectorSample], threshold: f64) -> Result<Vec<String>, PromError> {
    let mut out = Vec::new();
    for sample in result {
        let Some(metric) = sample.metric.get("metric_name") else {
            tracing::debug!("ranking sample without a metric_name label, skipping");
            continue;
        };
        let value = sample
            .sample_value()
            .map_err(|e| PromError::Decode(format!("ranking sample value: {e}")))?;
        if value >= threshold {
            out.push(metric.clone());
        }
    }
    Ok(out)
}

/// Single pass over the series list: every (label, value) pair feeds a
/// per-label distinct-value set.
fn track_label_values(series: &[SeriesLabels]) -> HashMap<String, HashSet<String>> {
    let mut tracker: HashMap<String, HashSet<String>> = HashMap::new();
    for labels in series {
        for (label, value) in labels {
            tracker.entry(label.clone()).or_default().insert(value.clone());
        }
    }
    tracker
}

/// The label with the most distinct values. Candidates are visited in
/// lexicographic order and only a strictly larger count displaces the
/// current winner, so ties resolve deterministically. `__name__` is constant
/// within one metric's series and is never a candidate.
fn winning_label(tracker: &HashMap<String, HashSet<String>>) -> Option<(String, usize)> {
    let mut labels: Vec<&String> = tracker.keys().collect();
    labels.sort();

    let mut winner: Option<(&String, usize)> = None;
    for label in labels {
        if label == "__name__" {
            continue;
        }
        let count = tracker[label].len();
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((label, count));
        }
    }
    winner.map(|(label, count)| (label.clone(), count))
}
