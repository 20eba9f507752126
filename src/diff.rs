//! Change detection between the working tree and the build manifest.
//!
//! The detector hashes every file under the content root and diffs the
//! result against the digest map stored in the [`BuildManifest`]:
//!
//! - present now, absent from the manifest → **added**
//! - present in both with different digests → **modified**
//! - present in the manifest, absent now → **deleted**
//!
//! With no manifest (first build) every current file is reported as added,
//! which upstream treats as the full-build signal.
//!
//! Hashing is parallelized with rayon: digests are pure functions of file
//! contents and each map entry is keyed by a unique path, so per-file work
//! is independent.

use crate::cache::{self, BuildManifest, CONFIG_HASH_KEY};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Paths that changed since the last recorded build. Membership is what
/// matters; the sets carry no ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: HashSet<String>,
    pub modified: HashSet<String>,
    pub deleted: HashSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Whether `rel_path` is recorded as added or modified.
    pub fn touches(&self, rel_path: &str) -> bool {
        self.added.contains(rel_path) || self.modified.contains(rel_path)
    }
}

/// Compare the current tree under `root_dir` against `manifest`.
///
/// When `manifest` is `None`, every file is returned as added (full-build
/// signal upstream).
pub fn detect(
    root_dir: &Path,
    manifest: Option<&BuildManifest>,
) -> Result<ChangeSet, DiffError> {
    let current = hash_tree(root_dir)?;

    let Some(manifest) = manifest else {
        return Ok(ChangeSet {
            added: current.into_keys().collect(),
            ..Default::default()
        });
    };

    let mut cs = ChangeSet::default();
    for (path, digest) in &current {
        match manifest.file_hashes.get(path) {
            None => {
                cs.added.insert(path.clone());
            }
            Some(prev) if prev != digest => {
                cs.modified.insert(path.clone());
            }
            Some(_) => {}
        }
    }
    for path in manifest.file_hashes.keys() {
        // The reserved config entry is not a file under the content root.
        if path == CONFIG_HASH_KEY {
            continue;
        }
        if !current.contains_key(path) {
            cs.deleted.insert(path.clone());
        }
    }
    Ok(cs)
}

/// True when the stored config digest is missing or differs from
/// `current_config_hash`. An absent manifest counts as changed (first build).
pub fn config_changed(manifest: Option<&BuildManifest>, current_config_hash: &str) -> bool {
    match manifest {
        None => true,
        Some(m) => m
            .file_hashes
            .get(CONFIG_HASH_KEY)
            .is_none_or(|stored| stored != current_config_hash),
    }
}

/// Walk `root_dir` and return a map of relative path → SHA-256 hex digest,
/// one entry per file.
pub fn hash_tree(root_dir: &Path) -> Result<HashMap<String, String>, DiffError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        files.push((rel, entry.into_path()));
    }

    files
        .par_iter()
        .map(|(rel, path)| {
            cache::hash_file(path)
                .map(|digest| (rel.clone(), digest))
                .map_err(|source| DiffError::Hash {
                    path: path.clone(),
                    source,
                })
        })
        .collect()
}
