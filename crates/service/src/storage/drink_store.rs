use async_trait::async_trait;
use models::Drink;

use crate::errors::ServiceError;

/// Whole-document persistence of drink records.
/// Implementations never write partially; `save` replaces everything.
#[async_trait]
pub trait DrinkStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Drink>, ServiceError>;
    async fn save(&self, drinks: &[Drink]) -> Result<(), ServiceError>;
}
