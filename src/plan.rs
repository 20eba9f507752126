//! Full-vs-incremental build planning and cache invalidation.
//!
//! The planner decides, once per invocation, whether change detection can be
//! trusted. A build is **full** when any of these hold:
//!
//! - the caller forced it (`--full`),
//! - no manifest exists (first build),
//! - the config file's digest differs from the one recorded in the manifest.
//!
//! A changed configuration can alter every output page (theme, base URL), so
//! per-file diffing is unsound in that case. When a full build is forced and
//! a manifest existed, the whole cache directory is cleared first — stale
//! cached HTML under a changed config must never be served. A failure while
//! clearing aborts the build: partial cache state is unsafe to continue from.

use crate::cache::{self, BuildManifest, CacheError};
use crate::diff;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("load manifest: {0}")]
    Manifest(#[from] CacheError),
    #[error("clear cache {path}: {source}")]
    ClearCache {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Full,
    Incremental,
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildMode::Full => write!(f, "full"),
            BuildMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// The planner's verdict: which mode to build in, and the manifest to diff
/// against (`None` for full builds).
#[derive(Debug)]
pub struct BuildPlan {
    pub mode: BuildMode,
    pub manifest: Option<BuildManifest>,
}

/// Choose the build mode and invalidate the cache when needed.
pub fn plan(
    force_full: bool,
    cache_dir: &Path,
    current_config_hash: &str,
) -> Result<BuildPlan, PlanError> {
    let manifest = cache::load_manifest(cache_dir)?;

    let full = force_full || diff::config_changed(manifest.as_ref(), current_config_hash);
    if !full {
        return Ok(BuildPlan {
            mode: BuildMode::Incremental,
            manifest,
        });
    }

    if manifest.is_some() {
        cache::clear_cache(cache_dir).map_err(|source| PlanError::ClearCache {
            path: cache_dir.to_path_buf(),
            source,
        })?;
    }
    Ok(BuildPlan {
        mode: BuildMode::Full,
        manifest: None,
    })
}
