use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use models::Drink;
use tokio::fs;
use tracing::debug;

use crate::errors::ServiceError;
use crate::storage::drink_store::DrinkStore;

/// JSON file holding the full array of drinks.
///
/// A missing file reads as an empty list. Anything that exists but cannot be
/// read or parsed is a [`ServiceError::Storage`]; a corrupt file is never
/// mistaken for an empty menu.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    file_path: PathBuf,
}

impl JsonFileStore {
    /// Prepare the store at `path`, creating the parent directory if missing.
    /// The file itself is only written on the first `save`.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| storage_err("create", parent, e))?;
        }
        Ok(Arc::new(Self { file_path }))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.file_path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

fn storage_err(op: &str, path: &Path, e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Storage(format!("{op} {}: {e}", path.display()))
}

#[async_trait]
impl DrinkStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Drink>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.file_path.display(), "store file missing; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(storage_err("read", &self.file_path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| storage_err("parse", &self.file_path, e))
    }

    async fn save(&self, drinks: &[Drink]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(drinks).map_err(|e| storage_err("serialize", &self.file_path, e))?;
        // write-then-rename so readers never see a half-written file
        let tmp = self.temp_path();
        fs::write(&tmp, data).await.map_err(|e| storage_err("write", &tmp, e))?;
        fs::rename(&tmp, &self.file_path).await.map_err(|e| storage_err("replace", &self.file_path, e))?;
        Ok(())
    }
}
