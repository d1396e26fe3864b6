use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::Utc;
use rand::Rng;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;

/// Image types accepted for upload, matched against both extension and MIME type.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

const REJECTED_TYPE_MESSAGE: &str = "Only image files are allowed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadRules {
    pub max_file_bytes: usize,
    pub max_files: usize,
}

impl Default for UploadRules {
    fn default() -> Self {
        Self { max_file_bytes: 5 * 1024 * 1024, max_files: 10 }
    }
}

/// One file part as received from the client, not yet on disk.
#[derive(Clone, Debug)]
pub struct IncomingImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The upload directory and the public URL prefix it is served under.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
    public_prefix: String,
    rules: UploadRules,
}

impl UploadStore {
    pub fn new<P: Into<PathBuf>>(dir: P, public_prefix: &str, rules: UploadRules) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
            rules,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    pub fn rules(&self) -> UploadRules {
        self.rules
    }

    /// Reject the request if it carries more files than allowed.
    pub fn check_count(&self, count: usize) -> Result<(), ServiceError> {
        if count > self.rules.max_files {
            return Err(ServiceError::UploadRejected(format!(
                "too many files: at most {} images per request",
                self.rules.max_files
            )));
        }
        Ok(())
    }

    /// Validate type and size; returns the normalized extension (with dot).
    pub fn check(&self, image: &IncomingImage) -> Result<String, ServiceError> {
        let ext = image
            .file_name
            .as_deref()
            .and_then(allowed_extension)
            .ok_or_else(|| ServiceError::UploadRejected(REJECTED_TYPE_MESSAGE.into()))?;
        if !image.content_type.as_deref().is_some_and(mime_allowed) {
            return Err(ServiceError::UploadRejected(REJECTED_TYPE_MESSAGE.into()));
        }
        if image.bytes.len() > self.rules.max_file_bytes {
            return Err(ServiceError::UploadRejected(format!(
                "file too large: limit is {} bytes",
                self.rules.max_file_bytes
            )));
        }
        Ok(format!(".{ext}"))
    }

    /// Write every image to the upload directory and return their public
    /// references in input order. All images are checked before anything is
    /// written; a failed write removes the files written so far.
    pub async fn persist(&self, images: Vec<IncomingImage>) -> Result<Vec<String>, ServiceError> {
        self.check_count(images.len())?;
        let exts = images.iter().map(|img| self.check(img)).collect::<Result<Vec<_>, _>>()?;

        let mut written = Vec::with_capacity(images.len());
        for (image, ext) in images.into_iter().zip(exts) {
            let file_name = generate_file_name(&ext);
            let path = self.dir.join(&file_name);
            if let Err(e) = fs::write(&path, &image.bytes).await {
                self.discard(&written).await;
                return Err(ServiceError::Storage(format!("write {}: {e}", path.display())));
            }
            debug!(file = %file_name, bytes = image.bytes.len(), "stored upload");
            written.push(format!("{}/{}", self.public_prefix, file_name));
        }
        Ok(written)
    }

    /// Whether `reference` names a file owned by this store.
    pub fn is_local(&self, reference: &str) -> bool {
        self.local_path(reference).is_some()
    }

    /// Map a local reference to its path on disk. External URLs and anything
    /// that would escape the upload directory map to `None`.
    pub fn local_path(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(&self.public_prefix)?.strip_prefix('/')?;
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        plain.then(|| self.dir.join(name))
    }

    /// Remove the file behind a local reference. Missing files and external
    /// references are ignored; other failures are logged and reported as `false`.
    pub async fn remove(&self, reference: &str) -> bool {
        let Some(path) = self.local_path(reference) else { return true };
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(file = %path.display(), "removed image file");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(file = %path.display(), "image file already gone");
                true
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to remove image file");
                false
            }
        }
    }

    /// Best-effort removal of several references.
    pub async fn discard(&self, references: &[String]) {
        for reference in references {
            self.remove(reference).await;
        }
    }
}

fn allowed_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES.contains(&ext.as_str()).then_some(ext)
}

fn mime_allowed(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("image/") && ALLOWED_IMAGE_TYPES.iter().any(|t| ct.contains(t))
}

/// `drink-<unix millis>-<random>.<ext>`
fn generate_file_name(ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("drink-{}-{}{}", Utc::now().timestamp_millis(), suffix, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UploadStore {
        let dir = std::env::temp_dir().join(format!("uploads_{}", uuid::Uuid::new_v4()));
        UploadStore::new(dir, "/uploads", UploadRules { max_file_bytes: 16, max_files: 2 })
    }

    fn png(name: &str) -> IncomingImage {
        IncomingImage { file_name: Some(name.into()), content_type: Some("image/png".into()), bytes: b"\x89PNG".to_vec() }
    }

    #[test]
    fn accepts_known_image_types_only() {
        let s = store();
        assert_eq!(s.check(&png("Photo.PNG")).unwrap(), ".png");
        let jpeg = IncomingImage { file_name: Some("a.jpg".into()), content_type: Some("image/jpeg".into()), bytes: vec![] };
        assert_eq!(s.check(&jpeg).unwrap(), ".jpg");

        let text = IncomingImage { file_name: Some("notes.txt".into()), content_type: Some("text/plain".into()), bytes: vec![] };
        assert!(matches!(s.check(&text), Err(ServiceError::UploadRejected(_))));
        let disguised = IncomingImage { file_name: Some("x.png".into()), content_type: Some("application/pdf".into()), bytes: vec![] };
        assert!(matches!(s.check(&disguised), Err(ServiceError::UploadRejected(_))));
        let nameless = IncomingImage { file_name: None, content_type: Some("image/png".into()), bytes: vec![] };
        assert!(matches!(s.check(&nameless), Err(ServiceError::UploadRejected(_))));
    }

    #[test]
    fn enforces_size_and_count_limits() {
        let s = store();
        let big = IncomingImage { bytes: vec![0; 17], ..png("big.png") };
        assert!(matches!(s.check(&big), Err(ServiceError::UploadRejected(_))));
        assert!(s.check_count(2).is_ok());
        assert!(matches!(s.check_count(3), Err(ServiceError::UploadRejected(_))));
    }

    #[test]
    fn classifies_local_references() {
        let s = store();
        assert_eq!(s.local_path("/uploads/drink-1-2.png"), Some(s.dir().join("drink-1-2.png")));
        assert!(!s.is_local("http://x/uploads/a.png"));
        assert!(!s.is_local("/uploads/../data.json"));
        assert!(!s.is_local("/uploads/"));
        assert!(!s.is_local("/uploadsx/a.png"));
        assert!(!s.is_local("/uploads/a/b.png"));
    }

    #[test]
    fn generated_names_follow_pattern() {
        let name = generate_file_name(".webp");
        assert!(name.starts_with("drink-"));
        assert!(name.ends_with(".webp"));
        assert_eq!(name.trim_end_matches(".webp").split('-').count(), 3);
    }

    #[tokio::test]
    async fn persist_and_remove_round_trip() -> Result<(), anyhow::Error> {
        let s = store();
        fs::create_dir_all(s.dir()).await?;
        let refs = s.persist(vec![png("a.png"), png("b.png")]).await?;
        assert_eq!(refs.len(), 2);
        assert_ne!(refs[0], refs[1]);
        for r in &refs {
            assert!(r.starts_with("/uploads/drink-"));
            assert!(fs::metadata(s.local_path(r).unwrap()).await.is_ok());
        }

        assert!(s.remove(&refs[0]).await);
        assert!(fs::metadata(s.local_path(&refs[0]).unwrap()).await.is_err());
        // gone already, still fine
        assert!(s.remove(&refs[0]).await);
        assert!(s.remove("http://x/external.png").await);

        let _ = fs::remove_dir_all(s.dir()).await;
        Ok(())
    }

    #[tokio::test]
    async fn persist_rejects_batch_before_writing() -> Result<(), anyhow::Error> {
        let s = store();
        fs::create_dir_all(s.dir()).await?;
        let bad = IncomingImage { file_name: Some("evil.exe".into()), content_type: Some("application/octet-stream".into()), bytes: vec![] };
        assert!(matches!(s.persist(vec![png("ok.png"), bad]).await, Err(ServiceError::UploadRejected(_))));
        let mut entries = fs::read_dir(s.dir()).await?;
        assert!(entries.next_entry().await?.is_none());
        let _ = fs::remove_dir_all(s.dir()).await;
        Ok(())
    }
}
