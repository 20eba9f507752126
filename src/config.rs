//! Site configuration.
//!
//! Loads and validates `config.toml` from the project root. Every field has
//! a built-in default; user config files are sparse and only override the
//! values they name. Unknown keys are rejected to catch typos early.
//!
//! ```toml
//! [site]
//! title = "My Blog"                  # required
//! base_url = "https://example.com"   # required
//! description = ""
//! language = "en"
//!
//! [build]
//! content_dir = "content"
//! output_dir = "public"
//! assets_dir = "assets"
//! parallelism = 4
//! ```
//!
//! ## Override precedence
//!
//! Explicit CLI values beat file values, which beat built-in defaults. The
//! CLI layer collects its flags into [`Overrides`] and the driver applies
//! them after loading — configuration is always an explicit value passed
//! down, never ambient global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file within the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_OUTPUT_DIR: &str = "public";
const DEFAULT_ASSETS_DIR: &str = "assets";
const DEFAULT_PARALLELISM: usize = 4;
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Resolved site configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub build: BuildSection,
}

/// `[site]` — identity of the published site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Site title, shown in page headers and the feed. Required.
    pub title: String,
    /// Absolute base URL, no trailing slash. Required.
    pub base_url: String,
    pub description: String,
    pub language: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: String::new(),
            base_url: String::new(),
            description: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// `[build]` — directory layout and worker count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    pub content_dir: String,
    pub output_dir: String,
    pub assets_dir: String,
    /// Page-generation worker count. Values below 1 are treated as 1.
    pub parallelism: usize,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            content_dir: DEFAULT_CONTENT_DIR.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            assets_dir: DEFAULT_ASSETS_DIR.to_string(),
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl SiteConfig {
    /// Check required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.title.is_empty() {
            return Err(ConfigError::Validation("site.title is required".into()));
        }
        if self.site.base_url.is_empty() {
            return Err(ConfigError::Validation("site.base_url is required".into()));
        }
        Ok(())
    }

    /// Apply CLI overrides on top of the loaded file values.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(output_dir) = &overrides.output_dir {
            self.build.output_dir = output_dir.clone();
        }
        if let Some(parallelism) = overrides.parallelism {
            self.build.parallelism = parallelism;
        }
    }
}

/// Explicit CLI-level overrides (highest precedence).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<String>,
    pub parallelism: Option<usize>,
}

/// Read and validate `config.toml` from `root_dir`.
///
/// A missing file is an error — a project without configuration has no
/// title or base URL to build with.
pub fn load_config(root_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root_dir.join(CONFIG_FILENAME);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path));
        }
        Err(e) => return Err(e.into()),
    };
    let config: SiteConfig = toml::from_str(&data)?;
    config.validate()?;
    Ok(config)
}

/// A documented stock `config.toml`, printed by `kiln gen-config`.
pub fn stock_config_toml() -> String {
    format!(
        r#"# kiln site configuration.
# Only [site].title and [site].base_url are required; every other value
# shown here is the built-in default.

[site]
title = ""
base_url = ""
description = ""
language = "{DEFAULT_LANGUAGE}"

[build]
content_dir = "{DEFAULT_CONTENT_DIR}"
output_dir = "{DEFAULT_OUTPUT_DIR}"
assets_dir = "{DEFAULT_ASSETS_DIR}"
parallelism = {DEFAULT_PARALLELISM}
"#
    )
}
