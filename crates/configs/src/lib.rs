use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 3000, worker_threads: Some(4) }
    }
}

/// Where records, uploaded images and the static front-end live.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// URL prefix under which uploads are served, e.g. `/uploads`.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            uploads_dir: default_uploads_dir(),
            public_dir: default_public_dir(),
            public_prefix: default_public_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_file_bytes: default_max_file_bytes(), max_files: default_max_files() }
    }
}

fn default_data_file() -> PathBuf { PathBuf::from("data/data.json") }
fn default_uploads_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_public_dir() -> PathBuf { PathBuf::from("public") }
fn default_public_prefix() -> String { "/uploads".to_string() }
fn default_max_file_bytes() -> usize { 5 * 1024 * 1024 }
fn default_max_files() -> usize { 10 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` if present (defaults otherwise), apply environment
    /// overrides, then validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) => match e.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
                _ => return Err(e),
            },
        };
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Environment variables win over file values.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        let port = std::env::var("PORT").or_else(|_| std::env::var("SERVER_PORT"));
        if let Some(p) = port.ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = p;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Ok(p) = std::env::var("DATA_FILE") {
            self.storage.data_file = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("PUBLIC_DIR") {
            self.storage.public_dir = PathBuf::from(p);
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.normalize()?;
        self.uploads.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(anyhow!("storage.data_file must not be empty"));
        }
        if self.uploads_dir.as_os_str().is_empty() {
            return Err(anyhow!("storage.uploads_dir must not be empty"));
        }
        let prefix = self.public_prefix.trim().trim_end_matches('/');
        if prefix.is_empty() {
            return Err(anyhow!("storage.public_prefix must not be empty"));
        }
        self.public_prefix = if prefix.starts_with('/') { prefix.to_string() } else { format!("/{prefix}") };
        Ok(())
    }
}

impl UploadConfig {
    fn validate(&self) -> Result<()> {
        if self.max_file_bytes == 0 {
            return Err(anyhow!("uploads.max_file_bytes must be > 0"));
        }
        if self.max_files == 0 {
            return Err(anyhow!("uploads.max_files must be > 0"));
        }
        Ok(())
    }
}
