mod configmap;
mod file;
mod memory;

pub use configmap::ConfigMapConfigurator;
pub use file::FileConfigurator;
pub use memory::InMemoryConfigurator;

use std::future::Future;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Cluster(kube::Error),
    Payload(std::string::FromUtf8Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Cluster(e) => write!(f, "cluster: {e}"),
            Self::Payload(e) => write!(f, "payload is not valid UTF-8: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Whole-document access to one persisted configuration document.
///
/// `read` yields empty bytes, not an error, when the backing resource or key
/// does not exist yet, so callers can bootstrap from nothing. `write`
/// replaces the full document.
pub trait Configurator: Send + Sync {
    fn read(&self) -> impl Future<Output = Result<Vec<u8>, StoreError>> + Send;
    fn write(&self, data: Vec<u8>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Runtime-selected backend without trait objects.
pub enum AnyConfigurator {
    File(FileConfigurator),
    ConfigMap(ConfigMapConfigurator),
    Memory(InMemoryConfigurator),
}

impl Configurator for AnyConfigurator {
    async fn read(&self) -> Result<Vec<u8>, StoreError> {
        match self {
            Self::File(c) => c.read().await,
            Self::ConfigMap(c) => c.read().await,
            Self::Memory(c) => c.read().await,
        }
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), StoreError> {
        match self {
            Self::File(c) => c.write(data).await,
            Self::ConfigMap(c) => c.write(data).await,
            Self::Memory(c) => c.write(data).await,
        }
    }
}
