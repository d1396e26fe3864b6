//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

use std::path::Path;

/// Ensure expected directories exist; warn on missing optional ones.
pub async fn ensure_env(public_dir: &Path, data_dir: &Path, uploads_dir: &Path) -> anyhow::Result<()> {
    common::env::ensure_env(public_dir, data_dir, uploads_dir).await
}
