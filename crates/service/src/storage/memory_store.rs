use std::sync::Arc;

use async_trait::async_trait;
use models::Drink;
use tokio::sync::RwLock;

use crate::errors::ServiceError;
use crate::storage::drink_store::DrinkStore;

/// In-process store, for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Vec<Drink>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_drinks(drinks: Vec<Drink>) -> Arc<Self> {
        Arc::new(Self { inner: RwLock::new(drinks) })
    }
}

#[async_trait]
impl DrinkStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Drink>, ServiceError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, drinks: &[Drink]) -> Result<(), ServiceError> {
        let mut guard = self.inner.write().await;
        *guard = drinks.to_vec();
        Ok(())
    }
}
