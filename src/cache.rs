//! Build cache: content hashing, the build manifest, and cached article HTML.
//!
//! Rebuild speed depends on knowing what was built last time. This module
//! owns the on-disk cache directory that carries that knowledge between runs:
//!
//! ```text
//! .kiln/cache/
//! ├── manifest.json        # schema version, build time, path → digest map
//! └── html/
//!     └── <slug>.html      # rendered article bodies, one file per slug
//! ```
//!
//! ## Manifest
//!
//! The [`BuildManifest`] maps every tracked content file (relative path) to
//! the SHA-256 hex digest of its contents, plus one reserved entry
//! ([`CONFIG_HASH_KEY`]) holding the digest of the project config file.
//! Content-based rather than mtime-based so it survives `git checkout`
//! (which resets modification times).
//!
//! A missing manifest is a valid state — it means "first build" and is
//! reported as `None`, never as an error. A manifest that exists but cannot
//! be read or parsed is fatal: building on top of a corrupt cache record
//! could silently serve stale pages.
//!
//! ## Durability
//!
//! [`save_manifest`] writes to a temporary file in the cache directory and
//! renames it over `manifest.json`. A crash mid-write leaves the previous
//! manifest intact; a concurrent reader never observes a half-written file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILENAME: &str = "manifest.json";

/// Subdirectory holding cached rendered article bodies.
const HTML_DIR: &str = "html";

/// Reserved digest-map key for the configuration file's own digest.
pub const CONFIG_HASH_KEY: &str = "__config__";

/// Version of the manifest format. Bump to invalidate all existing caches
/// when the format or key computation changes.
const MANIFEST_VERSION: &str = "1";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted record of what was built last time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub version: String,
    pub build_time: DateTime<Utc>,
    /// Relative path → SHA-256 hex digest, plus the reserved
    /// [`CONFIG_HASH_KEY`] entry.
    pub file_hashes: HashMap<String, String>,
}

impl BuildManifest {
    /// Fresh manifest stamped with the current config digest.
    pub fn new(config_hash: &str) -> Self {
        let mut file_hashes = HashMap::new();
        file_hashes.insert(CONFIG_HASH_KEY.to_string(), config_hash.to_string());
        Self {
            version: MANIFEST_VERSION.to_string(),
            build_time: Utc::now(),
            file_hashes,
        }
    }

    /// Record the digest for a tracked file.
    pub fn insert(&mut self, rel_path: String, digest: String) {
        self.file_hashes.insert(rel_path, digest);
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Load the manifest from `cache_dir`.
///
/// Returns `Ok(None)` when the file does not exist yet (first build). Any
/// other I/O or deserialization failure is an error.
pub fn load_manifest(cache_dir: &Path) -> Result<Option<BuildManifest>, CacheError> {
    let path = cache_dir.join(MANIFEST_FILENAME);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let manifest: BuildManifest = serde_json::from_str(&data)?;
    Ok(Some(manifest))
}

/// Persist `manifest` to `cache_dir/manifest.json`, creating the cache
/// directory if needed.
///
/// The write goes to a temporary file first and is renamed into place, so a
/// crash between the two steps leaves the previous manifest untouched.
pub fn save_manifest(cache_dir: &Path, manifest: &BuildManifest) -> Result<(), CacheError> {
    std::fs::create_dir_all(cache_dir)?;
    let json = serde_json::to_string_pretty(manifest)?;
    let tmp = cache_dir.join(format!("{}.tmp", MANIFEST_FILENAME));
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, cache_dir.join(MANIFEST_FILENAME))?;
    Ok(())
}

/// Remove the entire cache subtree. A cache directory that does not exist
/// is already clear.
pub fn clear_cache(cache_dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(cache_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Read the cached rendered body for `slug`. Returns `Ok(None)` when no
/// cached entry exists.
pub fn read_cached_html(cache_dir: &Path, slug: &str) -> Result<Option<String>, CacheError> {
    let path = cache_dir.join(HTML_DIR).join(format!("{slug}.html"));
    match std::fs::read_to_string(&path) {
        Ok(html) => Ok(Some(html)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Store the rendered body for `slug` under `cache_dir/html/`.
pub fn write_cached_html(cache_dir: &Path, slug: &str, html: &str) -> Result<(), CacheError> {
    let dir = cache_dir.join(HTML_DIR);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(format!("{slug}.html")), html)?;
    Ok(())
}

/// Resolve the manifest path for a cache directory.
pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Manifest load / save
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut m = BuildManifest::new("cfg-hash");
        m.insert("posts/a.md".into(), "digest-a".into());
        m.insert("posts/b.md".into(), "digest-b".into());

        save_manifest(tmp.path(), &m).unwrap();
        let loaded = load_manifest(tmp.path()).unwrap().unwrap();

        assert_eq!(loaded.version, MANIFEST_VERSION);
        assert_eq!(loaded.file_hashes.len(), 3);
        assert_eq!(loaded.file_hashes["posts/a.md"], "digest-a");
        assert_eq!(loaded.file_hashes[CONFIG_HASH_KEY], "cfg-hash");
    }

    #[test]
    fn load_missing_manifest_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_manifest(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn load_corrupt_manifest_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "not json").unwrap();
        assert!(matches!(
            load_manifest(tmp.path()),
            Err(CacheError::Json(_))
        ));
    }

    #[test]
    fn save_creates_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("nested/cache");
        save_manifest(&cache_dir, &BuildManifest::new("h")).unwrap();
        assert!(manifest_path(&cache_dir).exists());
    }

    #[test]
    fn interrupted_save_leaves_previous_manifest_intact() {
        let tmp = TempDir::new().unwrap();
        let old = BuildManifest::new("old-config");
        save_manifest(tmp.path(), &old).unwrap();

        // Simulate a crash after the temp file was written but before the
        // rename: the temp file sits next to a still-valid manifest.
        fs::write(
            tmp.path().join(format!("{}.tmp", MANIFEST_FILENAME)),
            "{ partial",
        )
        .unwrap();

        let loaded = load_manifest(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded.file_hashes[CONFIG_HASH_KEY], "old-config");
    }

    #[test]
    fn save_replaces_existing_manifest() {
        let tmp = TempDir::new().unwrap();
        save_manifest(tmp.path(), &BuildManifest::new("first")).unwrap();
        save_manifest(tmp.path(), &BuildManifest::new("second")).unwrap();

        let loaded = load_manifest(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded.file_hashes[CONFIG_HASH_KEY], "second");
    }

    // =========================================================================
    // Clear
    // =========================================================================

    #[test]
    fn clear_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        save_manifest(&cache_dir, &BuildManifest::new("h")).unwrap();
        write_cached_html(&cache_dir, "post", "<p>hi</p>").unwrap();

        clear_cache(&cache_dir).unwrap();
        assert!(!cache_dir.exists());
    }

    #[test]
    fn clear_missing_dir_is_ok() {
        let tmp = TempDir::new().unwrap();
        clear_cache(&tmp.path().join("never-created")).unwrap();
    }

    // =========================================================================
    // Cached HTML
    // =========================================================================

    #[test]
    fn cached_html_roundtrip() {
        let tmp = TempDir::new().unwrap();
        write_cached_html(tmp.path(), "my-post", "<p>body</p>").unwrap();
        assert_eq!(
            read_cached_html(tmp.path(), "my-post").unwrap().as_deref(),
            Some("<p>body</p>")
        );
    }

    #[test]
    fn cached_html_absent_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(read_cached_html(tmp.path(), "nope").unwrap().is_none());
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn hash_file_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f.md");
        fs::write(&path, b"hello world").unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex is 64 chars
    }

    #[test]
    fn hash_file_changes_with_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f.md");

        fs::write(&path, b"version 1").unwrap();
        let h1 = hash_file(&path).unwrap();

        fs::write(&path, b"version 2").unwrap();
        let h2 = hash_file(&path).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(hash_file(&tmp.path().join("absent.md")).is_err());
    }
}
