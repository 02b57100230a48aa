use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ObjectMeta, PostParams};
use labelguard_common::retry::{retry_if, RetryConfig};

use super::{Configurator, StoreError};

/// ConfigMap-backed configurator.
///
/// Writes follow the fetch-latest, mutate, submit protocol: the whole cycle
/// is retried with backoff while the API server reports a version conflict,
/// and aborts on any other error. This protects one logical write against
/// concurrent external mutation of the same ConfigMap.
pub struct ConfigMapConfigurator {
    api: Api<ConfigMap>,
    name: String,
    key: String,
    retry: RetryConfig,
}

impl ConfigMapConfigurator {
    pub fn new(client: kube::Client, namespace: &str, name: &str, key: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_string(),
            key: key.to_string(),
            retry: RetryConfig::default(),
        }
    }

    fn is_conflict(err: &StoreError) -> bool {
        matches!(err, StoreError::Cluster(kube::Error::Api(resp)) if resp.code == 409)
    }

    async fn write_once(&self, payload: &str) -> Result<(), StoreError> {
        match self.api.get_opt(&self.name).await.map_err(StoreError::Cluster)? {
            Some(mut cm) => {
                cm.data
                    .get_or_insert_with(BTreeMap::new)
                    .insert(self.key.clone(), payload.to_string());
                cm.metadata.managed_fields = None;
                self.api
                    .replace(&self.name, &PostParams::default(), &cm)
                    .await
                    .map_err(StoreError::Cluster)?;
            }
            None => {
                let cm = ConfigMap {
                    metadata: ObjectMeta {
                        name: Some(self.name.clone()),
                        ..ObjectMeta::default()
                    },
                    data: Some(BTreeMap::from([(self.key.clone(), payload.to_string())])),
                    ..ConfigMap::default()
                };
                self.api
                    .create(&PostParams::default(), &cm)
                    .await
                    .map_err(StoreError::Cluster)?;
            }
        }
        Ok(())
    }
}

impl Configurator for ConfigMapConfigurator {
    async fn read(&self) -> Result<Vec<u8>, StoreError> {
        let Some(cm) = self.api.get_opt(&self.name).await.map_err(StoreError::Cluster)? else {
            return Ok(Vec::new());
        };
        Ok(cm
            .data
            .and_then(|data| data.get(&self.key).cloned())
            .map(String::into_bytes)
            .unwrap_or_default())
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), StoreError> {
        let payload = String::from_utf8(data).map_err(StoreError::Payload)?;
        let result = retry_if(&self.retry, Self::is_conflict, || self.write_once(&payload)).await;
        if result.is_ok() {
            tracing::info!(configmap = %self.name, key = %self.key, "updated ConfigMap");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn conflict_error() -> StoreError {
        StoreError::Cluster(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "the object has been modified".into(),
            reason: "Conflict".into(),
            code: 409,
        }))
    }

    fn forbidden_error() -> StoreError {
        StoreError::Cluster(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "forbidden".into(),
            reason: "Forbidden".into(),
            code: 403,
        }))
    }

    #[test]
    fn only_version_conflicts_are_retryable() {
        assert!(ConfigMapConfigurator::is_conflict(&conflict_error()));
        assert!(!ConfigMapConfigurator::is_conflict(&forbidden_error()));
        assert!(!ConfigMapConfigurator::is_conflict(&StoreError::Io(
            std::io::Error::other("disk")
        )));
    }
}
