//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the writable directories exist; warn when the static assets
/// directory is missing.
pub async fn ensure_env(public_dir: &Path, data_dir: &Path, uploads_dir: &Path) -> anyhow::Result<()> {
    if tokio::fs::metadata(public_dir).await.is_err() {
        warn!(public_dir = %public_dir.display(), "public assets directory not found; static assets may 404");
    }
    for dir in [data_dir, uploads_dir] {
        if dir.as_os_str().is_empty() {
            continue;
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    info!(data_dir = %data_dir.display(), uploads_dir = %uploads_dir.display(), "runtime directories ready");
    Ok(())
}
