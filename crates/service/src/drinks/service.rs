use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use models::{Drink, DrinkText};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::images::{resolver, UploadStore};
use crate::storage::DrinkStore;

/// Input for [`DrinkService::create`]. `uploaded` holds references to files
/// already written by [`UploadStore::persist`].
#[derive(Clone, Debug, Default)]
pub struct CreateDrink {
    pub name: Option<String>,
    pub description: Option<String>,
    pub uploaded: Vec<String>,
    pub url_images: Option<String>,
}

/// Input for [`DrinkService::update`].
#[derive(Clone, Debug, Default)]
pub struct UpdateDrink {
    pub name: Option<String>,
    pub description: Option<String>,
    pub uploaded: Vec<String>,
    pub url_images: Option<String>,
    pub kept_existing: Option<String>,
}

/// Application service for the drink menu.
///
/// Every mutation is a full load-modify-save of the store performed while
/// holding `write_lock`, so concurrent requests cannot overwrite each other.
/// After a successful save, local image files no longer referenced by any
/// drink are deleted.
pub struct DrinkService {
    store: Arc<dyn DrinkStore>,
    uploads: UploadStore,
    write_lock: Mutex<()>,
}

impl DrinkService {
    pub fn new(store: Arc<dyn DrinkStore>, uploads: UploadStore) -> Self {
        Self { store, uploads, write_lock: Mutex::new(()) }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub async fn list(&self) -> Result<Vec<Drink>, ServiceError> {
        self.store.load().await
    }

    pub async fn get(&self, id: i64) -> Result<Drink, ServiceError> {
        self.store
            .load()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ServiceError::not_found("Drink"))
    }

    #[instrument(skip(self, input), fields(uploads = input.uploaded.len()))]
    pub async fn create(&self, input: CreateDrink) -> Result<Drink, ServiceError> {
        let text = DrinkText::parse(input.name.as_deref(), input.description.as_deref())?;
        let images = resolver::resolve_create(input.uploaded, input.url_images.as_deref());

        let _guard = self.write_lock.lock().await;
        let mut drinks = self.store.load().await?;
        let drink = Drink::new(next_id(&drinks), text, images);
        drinks.push(drink.clone());
        self.store.save(&drinks).await?;

        info!(id = drink.id, images = drink.images().len(), "drink created");
        Ok(drink)
    }

    #[instrument(skip(self, input), fields(uploads = input.uploaded.len()))]
    pub async fn update(&self, id: i64, input: UpdateDrink) -> Result<Drink, ServiceError> {
        let text = DrinkText::parse(input.name.as_deref(), input.description.as_deref())?;

        let _guard = self.write_lock.lock().await;
        let mut drinks = self.store.load().await?;
        let drink = drinks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| ServiceError::not_found("Drink"))?;

        let previous = drink.images().to_vec();
        let images = resolver::resolve_update(
            input.uploaded,
            input.url_images.as_deref(),
            input.kept_existing.as_deref(),
            &previous,
        );
        drink.set_text(text);
        drink.set_images(images);
        let updated = drink.clone();

        self.store.save(&drinks).await?;
        let reaped = self.reap_orphans(&previous, &drinks).await;
        info!(id, images = updated.images().len(), reaped, "drink updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut drinks = self.store.load().await?;
        let idx = drinks
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| ServiceError::not_found("Drink"))?;
        let removed = drinks.remove(idx);

        self.store.save(&drinks).await?;
        let reaped = self.reap_orphans(removed.images(), &drinks).await;
        info!(id, reaped, "drink deleted");
        Ok(())
    }

    /// Delete local files among `candidates` that no drink references any more.
    /// Returns how many references were reaped.
    async fn reap_orphans(&self, candidates: &[String], drinks: &[Drink]) -> usize {
        let referenced: HashSet<&str> = drinks.iter().flat_map(|d| d.images()).map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut reaped = 0;
        for reference in candidates {
            if referenced.contains(reference.as_str())
                || !self.uploads.is_local(reference)
                || !seen.insert(reference.as_str())
            {
                continue;
            }
            self.uploads.remove(reference).await;
            reaped += 1;
        }
        reaped
    }
}

/// Creation time in millis, bumped past the largest existing id if needed.
fn next_id(drinks: &[Drink]) -> i64 {
    let now = Utc::now().timestamp_millis();
    match drinks.iter().map(|d| d.id).max() {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::images::UploadRules;
    use crate::storage::MemoryStore;
    use tokio::fs;

    struct Fixture {
        svc: DrinkService,
        store: Arc<MemoryStore>,
        dir: PathBuf,
    }

    async fn fixture() -> Fixture {
        let dir = std::env::temp_dir().join(format!("drink_svc_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let store = MemoryStore::new();
        let uploads = UploadStore::new(&dir, "/uploads", UploadRules::default());
        let svc = DrinkService::new(store.clone(), uploads);
        Fixture { svc, store, dir }
    }

    impl Fixture {
        /// Put a file in the upload dir and return its reference.
        async fn upload(&self, name: &str) -> String {
            fs::write(self.dir.join(name), b"img").await.unwrap();
            format!("/uploads/{name}")
        }

        async fn exists(&self, reference: &str) -> bool {
            let name = reference.trim_start_matches("/uploads/");
            fs::metadata(self.dir.join(name)).await.is_ok()
        }

        async fn cleanup(self) {
            let _ = fs::remove_dir_all(&self.dir).await;
        }
    }

    fn create_input(name: &str, description: &str) -> CreateDrink {
        CreateDrink { name: Some(name.into()), description: Some(description.into()), ..Default::default() }
    }

    fn update_input(name: &str, description: &str) -> UpdateDrink {
        UpdateDrink { name: Some(name.into()), description: Some(description.into()), ..Default::default() }
    }

    #[tokio::test]
    async fn create_assigns_id_and_primary_image() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let a = f.upload("a.png").await;
        let drink = f
            .svc
            .create(CreateDrink { uploaded: vec![a.clone()], url_images: Some("http://x/1.png".into()), ..create_input(" Latte ", "Hot milk coffee") })
            .await?;
        assert_eq!(drink.name, "Latte");
        assert_eq!(drink.images(), [a.clone(), "http://x/1.png".to_string()]);
        assert_eq!(drink.image(), a);

        let bare = f.svc.create(create_input("Tea", "Green")).await?;
        assert!(bare.images().is_empty());
        assert_eq!(bare.image(), "");
        assert!(bare.id > drink.id);
        assert_eq!(f.svc.list().await?.len(), 2);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn create_requires_name_and_description() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        assert!(matches!(f.svc.create(create_input("   ", "x")).await, Err(ServiceError::Validation(_))));
        assert!(matches!(f.svc.create(create_input("x", "")).await, Err(ServiceError::Validation(_))));
        assert!(f.store.load().await?.is_empty());
        f.cleanup().await;
        Ok(())
    }

    #[test]
    fn ids_stay_unique_when_clock_lags() {
        let text = DrinkText::parse(Some("a"), Some("b")).unwrap();
        let future = Utc::now().timestamp_millis() + 60_000;
        let drinks = vec![Drink::new(future, text, vec![])];
        assert_eq!(next_id(&drinks), future + 1);
        assert!(next_id(&[]) > 0);
    }

    #[tokio::test]
    async fn update_without_image_fields_keeps_images() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let a = f.upload("a.png").await;
        let b = f.upload("b.png").await;
        let created = f.svc.create(CreateDrink { uploaded: vec![a.clone(), b.clone()], ..create_input("Mocha", "Choc") }).await?;

        let updated = f.svc.update(created.id, update_input("Mocha", "Dark choc")).await?;
        assert_eq!(updated.description, "Dark choc");
        assert_eq!(updated.images(), created.images());
        assert!(f.exists(&a).await && f.exists(&b).await);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn update_reaps_dropped_local_files() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let a = f.upload("a.png").await;
        let b = f.upload("b.png").await;
        let c = f.upload("c.png").await;
        let created = f.svc.create(CreateDrink { uploaded: vec![a.clone(), b.clone()], ..create_input("Mocha", "Choc") }).await?;

        let kept = serde_json::to_string(&[&b])?;
        let updated = f
            .svc
            .update(created.id, UpdateDrink { uploaded: vec![c.clone()], kept_existing: Some(kept), ..update_input("Mocha", "Choc") })
            .await?;
        assert_eq!(updated.images(), [b.clone(), c.clone()]);
        assert_eq!(updated.image(), b);
        assert!(!f.exists(&a).await);
        assert!(f.exists(&b).await && f.exists(&c).await);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn explicit_empty_kept_list_clears_images() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let a = f.upload("a.png").await;
        let created = f.svc.create(CreateDrink { uploaded: vec![a.clone()], ..create_input("Tea", "Green") }).await?;

        let updated = f
            .svc
            .update(created.id, UpdateDrink { kept_existing: Some("[]".into()), ..update_input("Tea", "Green") })
            .await?;
        assert!(updated.images().is_empty());
        assert_eq!(updated.image(), "");
        assert!(!f.exists(&a).await);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn kept_list_cannot_adopt_foreign_files() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let stray = f.upload("stray.png").await;
        let created = f.svc.create(create_input("Tea", "Green")).await?;

        let kept = serde_json::to_string(&[stray.as_str(), "/uploads/ghost.png"])?;
        let updated = f
            .svc
            .update(created.id, UpdateDrink { kept_existing: Some(kept), ..update_input("Tea", "Green") })
            .await?;
        assert!(updated.images().is_empty());

        f.svc
            .update(created.id, UpdateDrink { kept_existing: Some("[]".into()), ..update_input("Tea", "Green") })
            .await?;
        assert!(f.exists(&stray).await);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn update_errors() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let created = f.svc.create(create_input("Tea", "Green")).await?;
        assert!(matches!(f.svc.update(created.id + 1, update_input("a", "b")).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(f.svc.update(created.id, update_input("a", " ")).await, Err(ServiceError::Validation(_))));
        assert_eq!(f.svc.get(created.id).await?, created);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_reaps_unshared_files_only() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let own = f.upload("own.png").await;
        let shared = f.upload("shared.png").await;
        let first = f
            .svc
            .create(CreateDrink { uploaded: vec![own.clone(), shared.clone()], url_images: Some("http://x/e.png".into()), ..create_input("A", "a") })
            .await?;
        let second = f.svc.create(CreateDrink { url_images: Some(serde_json::to_string(&[&shared])?), ..create_input("B", "b") }).await?;

        f.svc.delete(first.id).await?;
        assert!(!f.exists(&own).await);
        assert!(f.exists(&shared).await);
        assert_eq!(f.svc.list().await?, vec![second]);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_unknown_id_leaves_store_unchanged() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let created = f.svc.create(create_input("Tea", "Green")).await?;
        assert!(matches!(f.svc.delete(created.id + 1).await, Err(ServiceError::NotFound(_))));
        assert_eq!(f.store.load().await?, vec![created]);
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_tolerates_missing_files() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let created = f
            .svc
            .create(CreateDrink { uploaded: vec!["/uploads/never-written.png".into()], ..create_input("Tea", "Green") })
            .await?;
        f.svc.delete(created.id).await?;
        assert!(f.svc.list().await?.is_empty());
        f.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_are_all_kept() -> Result<(), anyhow::Error> {
        let f = fixture().await;
        let svc = Arc::new(f.svc);
        let mut handles = Vec::new();
        for i in 0..8 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move { svc.create(create_input(&format!("Drink {i}"), "x")).await }));
        }
        for h in handles {
            h.await??;
        }
        let drinks = svc.list().await?;
        assert_eq!(drinks.len(), 8);
        let ids: HashSet<i64> = drinks.iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), 8);
        let _ = fs::remove_dir_all(&f.dir).await;
        Ok(())
    }
}
