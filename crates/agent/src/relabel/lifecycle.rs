use std::collections::BTreeMap;
use std::time::Duration;

use crate::configurator::{Configurator, StoreError};
use crate::prom::PromClient;
use crate::store::{SuppressionError, SuppressionStore};

use super::fingerprint::fingerprint;
use super::model::{
    decode_scrape_config, encode_scrape_config, HighCardSeries, RelabelRule, ScrapeConfigDoc,
    ScrapeJob,
};

const RELABEL_ACTION: &str = "replace";
const SIDE_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum LifecycleError {
    Store(StoreError),
    Suppression(SuppressionError),
    Codec(serde_yaml::Error),
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "scrape config store: {e}"),
            Self::Suppression(e) => write!(f, "suppression store: {e}"),
            Self::Codec(e) => write!(f, "scrape config codec: {e}"),
        }
    }
}

impl std::error::Error for LifecycleError {}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<SuppressionError> for LifecycleError {
    fn from(e: SuppressionError) -> Self {
        Self::Suppression(e)
    }
}

/// Builds the collapse-to-sentinel rule for a detected series. Deterministic
/// for a given input: the anchored pattern matches the metric name followed
/// by any joined label values, and the exploding label is rewritten to the
/// sentinel.
pub fn generate_rule(series: &HighCardSeries, sentinel: &str) -> RelabelRule {
    RelabelRule {
        source_labels: vec!["__name__".to_string(), series.label_name.clone()],
        regex: format!("^{};.*$", series.metric_name),
        target_label: series.label_name.clone(),
        replacement: sentinel.to_string(),
        action: RELABEL_ACTION.to_string(),
        extra: BTreeMap::new(),
    }
}

/// Inserts and removes silence rules across every scrape job, recording
/// provenance in the suppression store so each action is reversible.
pub struct RuleLifecycle<SC, BC> {
    scrape: SC,
    suppressions: SuppressionStore<BC>,
    prom: PromClient,
    http: reqwest::Client,
    sentinel: String,
    reset_endpoint: String,
}

impl<SC: Configurator, BC: Configurator> RuleLifecycle<SC, BC> {
    pub fn new(
        scrape: SC,
        suppressions: SuppressionStore<BC>,
        prom: PromClient,
        sentinel: impl Into<String>,
        reset_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            scrape,
            suppressions,
            prom,
            http: reqwest::Client::new(),
            sentinel: sentinel.into(),
            reset_endpoint: reset_endpoint.into(),
        }
    }

    pub fn suppressions(&self) -> &SuppressionStore<BC> {
        &self.suppressions
    }

    /// Ensures every scrape job carries the silence rule for `series` and
    /// records its fingerprint. Jobs that already have an equivalent rule
    /// (by fingerprint) are left untouched, so repeated application is
    /// idempotent. The scrape config is written before the provenance entry;
    /// if that write fails the store is not updated.
    pub async fn apply_silence(&self, series: &HighCardSeries) -> Result<(), LifecycleError> {
        let rule = generate_rule(series, &self.sentinel);
        let fp = fingerprint(&rule).map_err(LifecycleError::Codec)?;

        let mut doc = self.read_scrape_config().await?;
        let mut inserted = 0usize;
        for job in &mut doc.scrape_configs {
            if find_rule(job, &fp).map_err(LifecycleError::Codec)?.is_none() {
                tracing::info!(
                    job = %job.job_name,
                    metric = %series.metric_name,
                    label = %series.label_name,
                    "scrape job is missing the silence rule, adding it"
                );
                job.metric_relabel_configs.push(rule.clone());
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.write_scrape_config(&doc).await?;
        }

        self.suppressions
            .put(&series.metric_name, &series.label_name, &fp)
            .await?;

        self.reload_prometheus().await;
        self.reset_metric(&series.metric_name, &series.label_name).await;
        Ok(())
    }

    /// Reverses a recorded silence. Unknown (metric, label) pairs are a
    /// no-op. Exactly one matching rule is removed from each job that has
    /// one; the provenance entry is deleted before the scrape config is
    /// written, so a failed delete leaves the config untouched.
    pub async fn remove_silence(&self, metric: &str, label: &str) -> Result<(), LifecycleError> {
        let Some(fp) = self.suppressions.get(metric, label).await? else {
            tracing::info!(metric = %metric, label = %label, "no silence recorded, nothing to remove");
            return Ok(());
        };

        let mut doc = self.read_scrape_config().await?;
        let mut removed = 0usize;
        for job in &mut doc.scrape_configs {
            if let Some(i) = find_rule(job, &fp).map_err(LifecycleError::Codec)? {
                job.metric_relabel_configs.remove(i);
                removed += 1;
                tracing::info!(
                    job = %job.job_name,
                    metric = %metric,
                    label = %label,
                    "deleted silence rule from scrape job"
                );
            }
        }

        self.suppressions.delete(metric, label).await?;
        if removed > 0 {
            self.write_scrape_config(&doc).await?;
        }

        self.reload_prometheus().await;
        self.reset_metric(metric, label).await;
        Ok(())
    }

    async fn read_scrape_config(&self) -> Result<ScrapeConfigDoc, LifecycleError> {
        let bytes = self.scrape.read().await?;
        decode_scrape_config(&bytes).map_err(LifecycleError::Codec)
    }

    async fn write_scrape_config(&self, doc: &ScrapeConfigDoc) -> Result<(), LifecycleError> {
        let bytes = encode_scrape_config(doc).map_err(LifecycleError::Codec)?;
        self.scrape.write(bytes).await.map_err(LifecycleError::Store)
    }

    async fn reload_prometheus(&self) {
        if let Err(e) = self.prom.reload().await {
            tracing::warn!(error = %e, "prometheus config reload failed, continuing");
        }
    }

    async fn reset_metric(&self, metric: &str, label: &str) {
        let result = self
            .http
            .get(&self.reset_endpoint)
            .query(&[("metric", metric), ("label", label)])
            .timeout(SIDE_CALL_TIMEOUT)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(
                metric = %metric,
                label = %label,
                error = %e,
                "metric reset failed, continuing"
            );
        }
    }
}

/// Position of the first rule in `job` whose fingerprint matches `fp`.
fn find_rule(job: &ScrapeJob, fp: &str) -> Result<Option<usize>, serde_yaml::Error> {
    for (i, rule) in job.metric_relabel_configs.iter().enumerate() {
        if fingerprint(rule)? == fp {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::InMemoryConfigurator;
    use std::collections::BTreeSet;

    const TWO_JOBS: &str = r#"
scrape_configs:
- job_name: app
  static_configs:
  - targets: ["app:9100"]
  metric_relabel_configs:
  - source_labels: [instance]
    regex: canary-.*
    action: drop
- job_name: infra
  static_configs:
  - targets: ["infra:9100"]
"#;

    fn series() -> HighCardSeries {
        HighCardSeries {
            metric_name: "http_requests_total".into(),
            label_name: "user_id".into(),
        }
    }

    fn lifecycle(
        scrape: InMemoryConfigurator,
        suppression: InMemoryConfigurator,
    ) -> RuleLifecycle<InMemoryConfigurator, InMemoryConfigurator> {
        // Port 9 is unassigned locally, so the best-effort side calls fail
        // fast without failing the operation under test.
        let prom = PromClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        RuleLifecycle::new(
            scrape,
            SuppressionStore::new(suppression),
            prom,
            "lg_silence",
            "http://127.0.0.1:9/metrics/reset",
        )
    }

    fn decode(scrape: &InMemoryConfigurator) -> ScrapeConfigDoc {
        decode_scrape_config(&scrape.contents()).unwrap()
    }

    fn fingerprints_per_job(doc: &ScrapeConfigDoc) -> Vec<BTreeSet<String>> {
        doc.scrape_configs
            .iter()
            .map(|job| {
                job.metric_relabel_configs
                    .iter()
                    .map(|r| fingerprint(r).unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn generated_rule_shape() {
        let rule = generate_rule(&series(), "lg_silence");
        assert_eq!(rule.source_labels, vec!["__name__", "user_id"]);
        assert_eq!(rule.regex, "^http_requests_total;.*$");
        assert_eq!(rule.target_label, "user_id");
        assert_eq!(rule.replacement, "lg_silence");
        assert_eq!(rule.action, "replace");
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate_rule(&series(), "lg_silence");
        let b = generate_rule(&series(), "lg_silence");
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[tokio::test]
    async fn apply_inserts_the_rule_into_every_job() {
        let scrape = InMemoryConfigurator::seeded(TWO_JOBS);
        let lc = lifecycle(scrape.clone(), InMemoryConfigurator::new());

        lc.apply_silence(&series()).await.unwrap();

        let fp = fingerprint(&generate_rule(&series(), "lg_silence")).unwrap();
        let doc = decode(&scrape);
        for job in &doc.scrape_configs {
            assert!(find_rule(job, &fp).unwrap().is_some(), "job {}", job.job_name);
        }
        // The foreign drop rule on the app job is untouched.
        assert_eq!(doc.scrape_configs[0].metric_relabel_configs.len(), 2);
        assert_eq!(doc.scrape_configs[1].metric_relabel_configs.len(), 1);

        assert_eq!(
            lc.suppressions().get("http_requests_total", "user_id").await.unwrap(),
            Some(fp)
        );
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let scrape = InMemoryConfigurator::seeded(TWO_JOBS);
        let lc = lifecycle(scrape.clone(), InMemoryConfigurator::new());

        lc.apply_silence(&series()).await.unwrap();
        lc.apply_silence(&series()).await.unwrap();

        let fp = fingerprint(&generate_rule(&series(), "lg_silence")).unwrap();
        for job in &decode(&scrape).scrape_configs {
            let matches = job
                .metric_relabel_configs
                .iter()
                .filter(|r| fingerprint(r).unwrap() == fp)
                .count();
            assert_eq!(matches, 1, "job {}", job.job_name);
        }
    }

    #[tokio::test]
    async fn apply_only_touches_jobs_missing_the_rule() {
        let mut doc = decode_scrape_config(TWO_JOBS.as_bytes()).unwrap();
        doc.scrape_configs[1]
            .metric_relabel_configs
            .push(generate_rule(&series(), "lg_silence"));
        let scrape = InMemoryConfigurator::seeded(encode_scrape_config(&doc).unwrap());
        let lc = lifecycle(scrape.clone(), InMemoryConfigurator::new());

        lc.apply_silence(&series()).await.unwrap();

        let after = decode(&scrape);
        assert_eq!(after.scrape_configs[0].metric_relabel_configs.len(), 2);
        assert_eq!(after.scrape_configs[1].metric_relabel_configs.len(), 1);
    }

    #[tokio::test]
    async fn silence_then_unsilence_is_an_inverse() {
        let scrape = InMemoryConfigurator::seeded(TWO_JOBS);
        let lc = lifecycle(scrape.clone(), InMemoryConfigurator::new());
        let before = fingerprints_per_job(&decode(&scrape));

        lc.apply_silence(&series()).await.unwrap();
        assert_ne!(fingerprints_per_job(&decode(&scrape)), before);

        lc.remove_silence("http_requests_total", "user_id").await.unwrap();
        assert_eq!(fingerprints_per_job(&decode(&scrape)), before);
        assert!(lc.suppressions().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_without_recorded_silence_is_a_noop() {
        let scrape = InMemoryConfigurator::seeded(TWO_JOBS);
        let lc = lifecycle(scrape.clone(), InMemoryConfigurator::new());
        let before = decode(&scrape);

        lc.remove_silence("http_requests_total", "user_id").await.unwrap();

        assert_eq!(decode(&scrape), before);
    }

    #[tokio::test]
    async fn remove_deletes_one_copy_per_job() {
        // Duplicate job names are possible; each job loses its own copy.
        let mut doc = decode_scrape_config(TWO_JOBS.as_bytes()).unwrap();
        let mut duplicate = doc.scrape_configs[1].clone();
        duplicate.job_name = "infra".into();
        doc.scrape_configs.push(duplicate);
        let scrape = InMemoryConfigurator::seeded(encode_scrape_config(&doc).unwrap());
        let lc = lifecycle(scrape.clone(), InMemoryConfigurator::new());

        lc.apply_silence(&series()).await.unwrap();
        lc.remove_silence("http_requests_total", "user_id").await.unwrap();

        let fp = fingerprint(&generate_rule(&series(), "lg_silence")).unwrap();
        for job in &decode(&scrape).scrape_configs {
            assert!(find_rule(job, &fp).unwrap().is_none());
        }
    }
}
