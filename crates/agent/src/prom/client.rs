use std::time::Duration;

use super::model::{InstantQueryResponse, SeriesLabels, SeriesResponse};

#[derive(Debug)]
pub enum PromError {
    Transport(reqwest::Error),
    Status(u16),
    Decode(String),
    Backend(String),
}

impl std::fmt::Display for PromError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Status(code) => write!(f, "backend returned status {code}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Backend(status) => write!(f, "backend reported query status {status:?}"),
        }
    }
}

impl std::error::Error for PromError {}

/// Client for the two Prometheus query shapes the detector relies on, plus
/// the configuration-reload trigger. Every request carries the configured
/// timeout so one slow backend call cannot stall a patrol pass indefinitely.
#[derive(Clone)]
pub struct PromClient {
    base_url: String,
    http: reqwest::Client,
}

impl PromClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PromError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PromError::Transport)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn instant_query(&self, expr: &str) -> Result<InstantQueryResponse, PromError> {
        let resp = self
            .http
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", expr)])
            .send()
            .await
            .map_err(PromError::Transport)?;
        let parsed: InstantQueryResponse = decode(resp).await?;
        if parsed.status != "success" {
            return Err(PromError::Backend(parsed.status));
        }
        Ok(parsed)
    }

    /// Lists the active series matching `matcher`, optionally bounded to a
    /// `(start, end)` unix-seconds window.
    pub async fn series(
        &self,
        matcher: &str,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<SeriesLabels>, PromError> {
        let mut req = self
            .http
            .get(format!("{}/api/v1/series", self.base_url))
            .query(&[("match[]", matcher)]);
        if let Some((start, end)) = window {
            req = req.query(&[("start", start.to_string()), ("end", end.to_string())]);
        }
        let resp = req.send().await.map_err(PromError::Transport)?;
        let parsed: SeriesResponse = decode(resp).await?;
        if parsed.status != "success" {
            return Err(PromError::Backend(parsed.status));
        }
        Ok(parsed.data)
    }

    /// Asks Prometheus to reload its configuration. Callers treat failures
    /// as non-fatal.
    pub async fn reload(&self) -> Result<(), PromError> {
        let resp = self
            .http
            .post(format!("{}/-/reload", self.base_url))
            .send()
            .await
            .map_err(PromError::Transport)?;
        let status = resp.status().as_u16();
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(PromError::Status(status))
        }
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, PromError> {
    let status = resp.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(PromError::Status(status));
    }
    let body = resp.bytes().await.map_err(PromError::Transport)?;
    serde_json::from_slice(&body).map_err(|e| PromError::Decode(e.to_string()))
}
