use std::io::ErrorKind;
use std::path::PathBuf;

use super::{Configurator, StoreError};

pub struct FileConfigurator {
    path: PathBuf,
}

impl FileConfigurator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Configurator for FileConfigurator {
    async fn read(&self) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), StoreError> {
        tokio::fs::write(&self.path, data).await.map_err(StoreError::Io)
    }
}
