use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::configurator::{Configurator, StoreError};

/// Persisted provenance: metric name → label name → fingerprint of the rule
/// that silenced it. Invariant: a metric key exists iff it has at least one
/// suppressed label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuppressionDoc {
    #[serde(default)]
    pub suppressed_metrics: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug)]
pub enum SuppressionError {
    Store(StoreError),
    Codec(serde_yaml::Error),
}

impl std::fmt::Display for SuppressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
        }
    }
}

impl std::error::Error for SuppressionError {}

impl From<StoreError> for SuppressionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Owns the suppression document. Every mutation reads the latest document,
/// mutates it in memory, and writes the whole document back; nothing is
/// cached across calls.
pub struct SuppressionStore<C> {
    backing: C,
}

impl<C: Configurator> SuppressionStore<C> {
    pub fn new(backing: C) -> Self {
        Self { backing }
    }

    pub async fn get(&self, metric: &str, label: &str) -> Result<Option<String>, SuppressionError> {
        let doc = self.read_doc().await?;
        Ok(doc
            .suppressed_metrics
            .get(metric)
            .and_then(|labels| labels.get(label))
            .cloned())
    }

    /// Records `fingerprint` for (metric, label), overwriting any prior one.
    pub async fn put(
        &self,
        metric: &str,
        label: &str,
        fingerprint: &str,
    ) -> Result<(), SuppressionError> {
        let mut doc = self.read_doc().await?;
        doc.suppressed_metrics
            .entry(metric.to_string())
            .or_default()
            .insert(label.to_string(), fingerprint.to_string());
        self.write_doc(&doc).await
    }

    /// Removes the entry for (metric, label). When that was the metric's
    /// last suppressed label the metric key is removed with it.
    pub async fn delete(&self, metric: &str, label: &str) -> Result<(), SuppressionError> {
        let mut doc = self.read_doc().await?;
        let Some(labels) = doc.suppressed_metrics.get_mut(metric) else {
            return Ok(());
        };
        if labels.remove(label).is_none() {
            return Ok(());
        }
        if labels.is_empty() {
            doc.suppressed_metrics.remove(metric);
        }
        self.write_doc(&doc).await
    }

    /// All (metric, label) pairs, sorted.
    pub async fn list(&self) -> Result<Vec<(String, String)>, SuppressionError> {
        let doc = self.read_doc().await?;
        let mut out = Vec::new();
        for (metric, labels) in &doc.suppressed_metrics {
            for label in labels.keys() {
                out.push((metric.clone(), label.clone()));
            }
        }
        Ok(out)
    }

    async fn read_doc(&self) -> Result<SuppressionDoc, SuppressionError> {
        let bytes = self.backing.read().await?;
        if bytes.is_empty() {
            return Ok(SuppressionDoc::default());
        }
        serde_yaml::from_slice(&bytes).map_err(SuppressionError::Codec)
    }

    async fn write_doc(&self, doc: &SuppressionDoc) -> Result<(), SuppressionError> {
        let bytes = serde_yaml::to_string(doc)
            .map_err(SuppressionError::Codec)?
            .into_bytes();
        self.backing.write(bytes).await.map_err(SuppressionError::Store)
    }
}
