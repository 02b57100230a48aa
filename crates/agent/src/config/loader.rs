use std::path::Path;

use super::schema::{Settings, StorageBackend};

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e)
    }
}

/// Loads settings from `path`, or the built-in defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<Settings, LoadError> {
    match path {
        Some(p) => load_from_file(p),
        None => Ok(Settings::default()),
    }
}

pub fn load_from_file(path: &Path) -> Result<Settings, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<Settings, LoadError> {
    let cfg: Settings = serde_yaml::from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Settings) -> Result<(), LoadError> {
    if cfg.prometheus_url.is_empty() {
        return Err(LoadError::Validation("prometheus_url must not be empty".into()));
    }
    if cfg.patrol.interval_seconds == 0 {
        return Err(LoadError::Validation(
            "patrol.interval_seconds must be > 0".into(),
        ));
    }
    if cfg.patrol.top_n == 0 {
        return Err(LoadError::Validation("patrol.top_n must be > 0".into()));
    }
    if cfg.patrol.request_timeout_seconds == 0 {
        return Err(LoadError::Validation(
            "patrol.request_timeout_seconds must be > 0".into(),
        ));
    }
    if cfg.patrol.stability.window_seconds <= cfg.patrol.stability.step_back_seconds {
        return Err(LoadError::Validation(
            "patrol.stability.window_seconds must exceed step_back_seconds".into(),
        ));
    }
    match cfg.storage.backend {
        StorageBackend::File => {
            if cfg.storage.file.scrape_config_path.is_empty()
                || cfg.storage.file.suppression_path.is_empty()
            {
                return Err(LoadError::Validation(
                    "storage.file paths must not be empty".into(),
                ));
            }
        }
        StorageBackend::ConfigMap => {
            let cm = &cfg.storage.configmap;
            if cm.namespace.is_empty()
                || cm.scrape_name.is_empty()
                || cm.scrape_key.is_empty()
                || cm.suppression_name.is_empty()
                || cm.suppression_key.is_empty()
            {
                return Err(LoadError::Validation(
                    "storage.configmap names and keys must not be empty".into(),
                ));
            }
        }
    }
    Ok(())
}
