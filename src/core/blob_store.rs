//! Content-addressed blob storage for staged and generated media.
//!
//! Blobs live in a flat directory named by the first 16 hex chars of their
//! SHA256, keeping the original extension. Locators handed to the registry
//! have the form `blob:<hash>.<ext>`; anything else is treated as an opaque
//! external reference (URL or path) and passed through untouched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

/// Locator prefix for blobs owned by this store
pub const BLOB_SCHEME: &str = "blob:";

/// What a staged file is meant to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Poster,
}

impl MediaKind {
    /// Accepted file name patterns
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => &["*.mp4", "*.mov", "*.webm"],
            MediaKind::Poster => &["*.png", "*.jpg", "*.jpeg", "*.webp"],
        }
    }

    /// Check a file name against the accepted patterns (case-insensitive)
    pub fn accepts(self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_lowercase(),
            None => return false,
        };

        self.patterns()
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .any(|p| p.matches(&name))
    }
}

/// File-based blob store
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create or open a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create blob directory: {}", root.display()))?;

        Ok(Self { root })
    }

    /// Store bytes and return their locator
    pub async fn put(&self, bytes: &[u8], extension: &str) -> Result<String> {
        let name = format!("{}.{}", content_hash(bytes), sanitize_extension(extension));
        let path = self.root.join(&name);

        if !path.exists() {
            // Write beside the target, then rename so readers never see a partial blob
            let partial = self.root.join(format!(".{}.partial", name));
            fs::write(&partial, bytes)
                .await
                .with_context(|| format!("Failed to write blob: {}", partial.display()))?;
            fs::rename(&partial, &path)
                .await
                .with_context(|| format!("Failed to move blob into place: {}", path.display()))?;
        }

        debug!(blob = %name, size = bytes.len(), "Blob stored");
        Ok(format!("{}{}", BLOB_SCHEME, name))
    }

    /// Validate a local file and copy it into the store
    pub async fn stage_file(&self, path: &Path, kind: MediaKind) -> Result<String> {
        if !kind.accepts(path) {
            anyhow::bail!(
                "File '{}' is not an accepted {:?} type ({})",
                path.display(),
                kind,
                kind.patterns().join(", ")
            );
        }

        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read staged file: {}", path.display()))?;
        if bytes.is_empty() {
            anyhow::bail!("Staged file is empty: {}", path.display());
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        self.put(&bytes, &extension).await
    }

    /// Local path for a locator, if it refers to something on disk
    pub fn resolve(&self, locator: &str) -> Option<PathBuf> {
        if let Some(name) = locator.strip_prefix(BLOB_SCHEME) {
            // Blob names never contain separators
            if name.contains('/') || name.contains('\\') || name.starts_with('.') {
                return None;
            }
            let path = self.root.join(name);
            return path.exists().then_some(path);
        }

        let path = PathBuf::from(locator);
        path.is_file().then_some(path)
    }

    /// Read the bytes behind a local locator
    pub async fn load(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self
            .resolve(locator)
            .with_context(|| format!("Locator does not refer to local content: {}", locator))?;

        fs::read(&path)
            .await
            .with_context(|| format!("Failed to read blob: {}", path.display()))
    }
}

/// Hash content (first 16 hex chars of SHA256)
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

/// File extension of a locator or path, lowercased
pub fn locator_extension(locator: &str) -> Option<String> {
    let name = locator.rsplit(|c: char| c == '/' || c == ':').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

fn sanitize_extension(extension: &str) -> String {
    let ext = extension.trim_start_matches('.').to_lowercase();
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        "bin".to_string()
    } else {
        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_load() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).await.unwrap();

        let locator = store.put(b"video bytes", "MP4").await.unwrap();
        assert!(locator.starts_with("blob:"));
        assert!(locator.ends_with(".mp4"));

        assert_eq!(store.load(&locator).await.unwrap(), b"video bytes");
        // Same content, same locator
        assert_eq!(store.put(b"video bytes", "mp4").await.unwrap(), locator);
    }

    #[tokio::test]
    async fn test_stage_rejects_wrong_kind() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path()).await.unwrap();
        let file = temp.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();

        assert!(store.stage_file(&file, MediaKind::Video).await.is_err());
    }

    #[tokio::test]
    async fn test_stage_accepts_uppercase_extension() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path().join("blobs")).await.unwrap();
        let file = temp.path().join("Poster.PNG");
        std::fs::write(&file, [137, 80, 78, 71]).unwrap();

        let locator = store.stage_file(&file, MediaKind::Poster).await.unwrap();
        assert!(locator.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_resolve_refuses_traversal() {
        let temp = TempDir::new().unwrap();
        let store = BlobStore::open(temp.path()).await.unwrap();

        assert!(store.resolve("blob:../secret.mp4").is_none());
        assert!(store.resolve("https://example.com/a.mp4").is_none());
    }

    #[test]
    fn test_locator_extension() {
        assert_eq!(locator_extension("blob:abc.PNG").as_deref(), Some("png"));
        assert_eq!(locator_extension("/images/end-banner.png").as_deref(), Some("png"));
        assert_eq!(locator_extension("blob:noext"), None);
    }

    #[test]
    fn test_hash_consistency() {
        assert_eq!(content_hash(b"a"), content_hash(b"a"));
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
        assert_eq!(content_hash(b"a").len(), 16);
    }
}
