use std::sync::{Arc, Mutex};

use super::{Configurator, StoreError};

/// Shared-buffer configurator used by tests and local experiments.
#[derive(Clone, Default)]
pub struct InMemoryConfigurator {
    data: Arc<Mutex<Vec<u8>>>,
}

impl InMemoryConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data.into())),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().expect("configurator lock").clone()
    }
}

impl Configurator for InMemoryConfigurator {
    async fn read(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.contents())
    }

    async fn write(&self, data: Vec<u8>) -> Result<(), StoreError> {
        *self.data.lock().expect("configurator lock") = data;
        Ok(())
    }
}
