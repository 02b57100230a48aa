use std::collections::HashMap;

use serde::Deserialize;

/// One active series, as returned by the series-listing endpoint.
pub type SeriesLabels = HashMap<String, String>;

#[derive(Debug, Deserialize)]
pub struct InstantQueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: InstantQueryData,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstantQueryData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
pub struct VectorSample {
    pub metric: HashMap<String, String>,
    /// Timestamp plus the sample value as a decimal string.
    pub value: (f64, String),
}

impl VectorSample {
    pub fn sample_value(&self) -> Result<f64, std::num::ParseFloatError> {
        self.value.1.parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct SeriesResponse {
    pub status: String,
    #[serde(default)]
    pub data: Vec<SeriesLabels>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_instant_query_vector() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"metric_name": "http_requests_total"}, "value": [1700000000.123, "150"]},
                    {"metric": {"metric_name": "job_queue_depth"}, "value": [1700000000.123, "12.5"]}
                ]
            }
        }"#;
        let parsed: InstantQueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(parsed.data.result_type, "vector");
        assert_eq!(parsed.data.result.len(), 2);
        assert_eq!(
            parsed.data.result[0].metric["metric_name"],
            "http_requests_total"
        );
        assert_eq!(parsed.data.result[0].sample_value().unwrap(), 150.0);
        assert_eq!(parsed.data.result[1].sample_value().unwrap(), 12.5);
    }

    #[test]
    fn non_numeric_sample_value_is_an_error() {
        let sample = VectorSample {
            metric: HashMap::new(),
            value: (0.0, "NaN-ish".into()),
        };
        assert!(sample.sample_value().is_err());
    }

    #[test]
    fn parses_series_listing() {
        let body = r#"{
            "status": "success",
            "data": [
                {"__name__": "http_requests_total", "user_id": "u1", "instance": "a"},
                {"__name__": "http_requests_total", "user_id": "u2", "instance": "a"}
            ]
        }"#;
        let parsed: SeriesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[1]["user_id"], "u2");
    }

    #[test]
    fn empty_data_defaults() {
        let parsed: InstantQueryResponse =
            serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(parsed.data.result.is_empty());
    }
}
