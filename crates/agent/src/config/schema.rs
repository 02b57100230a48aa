use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub patrol: PatrolSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PatrolSettings {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// How many growth-rate leaders the ranking query over-fetches.
    #[serde(default = "default_top_n")]
    pub top_n: u32,
    /// Minimum one-minute cardinality delta for a metric to become a candidate.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Name of the per-metric cardinality-tracking counter to rank by.
    #[serde(default = "default_cardinality_metric")]
    pub cardinality_metric: String,
    /// Value an exploding label is collapsed to.
    #[serde(default = "default_sentinel")]
    pub sentinel_value: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default)]
    pub stability: StabilitySettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StabilitySettings {
    /// When enabled, a candidate label whose historical value set stabilizes
    /// is considered bounded and is not silenced.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_stability_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_stability_window")]
    pub window_seconds: u64,
    #[serde(default = "default_stability_step")]
    pub step_back_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub file: FileStorageSettings,
    #[serde(default)]
    pub configmap: ConfigMapStorageSettings,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    ConfigMap,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FileStorageSettings {
    #[serde(default = "default_scrape_config_path")]
    pub scrape_config_path: String,
    #[serde(default = "default_suppression_path")]
    pub suppression_path: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConfigMapStorageSettings {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_scrape_name")]
    pub scrape_name: String,
    #[serde(default = "default_scrape_key")]
    pub scrape_key: String,
    #[serde(default = "default_suppression_name")]
    pub suppression_name: String,
    #[serde(default = "default_suppression_key")]
    pub suppression_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prometheus_url: default_prometheus_url(),
            api_port: default_api_port(),
            patrol: PatrolSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Default for PatrolSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            top_n: default_top_n(),
            threshold: default_threshold(),
            cardinality_metric: default_cardinality_metric(),
            sentinel_value: default_sentinel(),
            request_timeout_seconds: default_request_timeout(),
            max_consecutive_failures: default_max_consecutive_failures(),
            stability: StabilitySettings::default(),
        }
    }
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_stability_attempts(),
            window_seconds: default_stability_window(),
            step_back_seconds: default_stability_step(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            file: FileStorageSettings::default(),
            configmap: ConfigMapStorageSettings::default(),
        }
    }
}

impl Default for FileStorageSettings {
    fn default() -> Self {
        Self {
            scrape_config_path: default_scrape_config_path(),
            suppression_path: default_suppression_path(),
        }
    }
}

impl Default for ConfigMapStorageSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            scrape_name: default_scrape_name(),
            scrape_key: default_scrape_key(),
            suppression_name: default_suppression_name(),
            suppression_key: default_suppression_key(),
        }
    }
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_interval() -> u64 {
    5
}

fn default_top_n() -> u32 {
    5
}

fn default_threshold() -> f64 {
    100.0
}

fn default_cardinality_metric() -> String {
    "card_count".to_string()
}

fn default_sentinel() -> String {
    "lg_silence".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_stability_attempts() -> u32 {
    100
}

fn default_stability_window() -> u64 {
    600
}

fn default_stability_step() -> u64 {
    30
}

fn default_scrape_config_path() -> String {
    "/etc/labelguard/prometheus.yml".to_string()
}

fn default_suppression_path() -> String {
    "/etc/labelguard/suppressions.yml".to_string()
}

fn default_namespace() -> String {
    "monitoring".to_string()
}

fn default_scrape_name() -> String {
    "prometheus".to_string()
}

fn default_scrape_key() -> String {
    "prometheus.yml".to_string()
}

fn default_suppression_name() -> String {
    "labelguard".to_string()
}

fn default_suppression_key() -> String {
    "suppressions.yml".to_string()
}
