use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// The scrape-configuration document. Only the parts this agent manipulates
/// are modelled; everything else is carried through the flattened catch-all
/// so externally-authored configuration survives a read-modify-write cycle
/// byte-for-byte in meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfigDoc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scrape_configs: Vec<ScrapeJob>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One named scrape job. Job names are not guaranteed unique; each job is
/// processed independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_relabel_configs: Vec<RelabelRule>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A metric relabel rule. The agent only ever generates collapse-to-sentinel
/// rules, but rules authored elsewhere share the same sequence and must pass
/// through unharmed; their unmodelled fields land in the sorted catch-all,
/// which keeps the serialized form (and therefore the fingerprint) canonical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelabelRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub regex: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replacement: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A metric identified as exploding, together with the responsible label.
/// Lives only within a single detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighCardSeries {
    pub metric_name: String,
    pub label_name: String,
}

/// Empty input decodes to the empty document so a fresh installation can
/// bootstrap without a pre-seeded config.
pub fn decode_scrape_config(bytes: &[u8]) -> Result<ScrapeConfigDoc, serde_yaml::Error> {
    if bytes.is_empty() {
        return Ok(ScrapeConfigDoc::default());
    }
    serde_yaml::from_slice(bytes)
}

pub fn encode_scrape_config(doc: &ScrapeConfigDoc) -> Result<Vec<u8>, serde_yaml::Error> {
    serde_yaml::to_string(doc).map(String::into_bytes)
}
