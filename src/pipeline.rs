//! The build driver: one call runs the whole pipeline.
//!
//! ```text
//! plan ─→ detect ─→ load ─→ process ─→ graph ─→ generate ─→ manifest
//! ```
//!
//! [`run_build`] is the single entry point for the CLI and for anything
//! else that needs to trigger a rebuild (a development server would call it
//! once per filesystem event). It holds no state between invocations —
//! everything it needs arrives in [`BuildOptions`], and everything it
//! learned is persisted through the manifest store.
//!
//! Phase ordering matters for safety: the cache is only cleared inside
//! `plan` (before any generation), and the fresh manifest is only written
//! after generation succeeded, so a failed build never advances the
//! recorded state.

use crate::cache::{self, BuildManifest, CacheError};
use crate::config::{self, ConfigError, Overrides};
use crate::content::{self, ContentError, Site};
use crate::diff::{self, DiffError};
use crate::generate::{GenerateError, HtmlGenerator};
use crate::graph;
use crate::output::BuildReport;
use crate::plan::{self, BuildMode, PlanError};
use crate::feed;
use crate::render::{self, MarkdownRenderer, ProcessError};
use crate::templates::MaudTemplater;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Cache location relative to the project root.
const CACHE_SUBDIR: &str = ".kiln/cache";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("hash config {path}: {source}")]
    HashConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("plan: {0}")]
    Plan(#[from] PlanError),
    #[error("detect changes: {0}")]
    Diff(#[from] DiffError),
    #[error("load content: {0}")]
    Content(#[from] ContentError),
    #[error("process articles: {0}")]
    Process(#[from] ProcessError),
    #[error("generate pages: {0}")]
    Generate(#[from] GenerateError),
    #[error("write manifest: {0}")]
    Manifest(#[from] CacheError),
}

/// Everything a single build invocation needs.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root (the directory holding `config.toml`).
    pub root_dir: PathBuf,
    /// Bypass change detection and rebuild from scratch.
    pub force_full: bool,
    /// CLI-level config overrides (highest precedence).
    pub overrides: Overrides,
    /// Run every phase up to generation; write no output and record no
    /// manifest.
    pub dry_run: bool,
}

impl BuildOptions {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            force_full: false,
            overrides: Overrides::default(),
            dry_run: false,
        }
    }
}

/// Run the full build pipeline once.
pub fn run_build(opts: &BuildOptions) -> Result<BuildReport, BuildError> {
    let start = Instant::now();
    let root = &opts.root_dir;

    let mut cfg = config::load_config(root)?;
    cfg.apply_overrides(&opts.overrides);

    let cache_dir = root.join(CACHE_SUBDIR);
    let config_path = root.join(config::CONFIG_FILENAME);
    let config_hash =
        cache::hash_file(&config_path).map_err(|source| BuildError::HashConfig {
            path: config_path,
            source,
        })?;

    // Decide full vs. incremental; clears the cache when a full build is
    // forced over an existing manifest.
    let plan = plan::plan(opts.force_full, &cache_dir, &config_hash)?;

    let content_dir = root.join(&cfg.build.content_dir);
    let change_set = match plan.mode {
        BuildMode::Incremental => Some(diff::detect(&content_dir, plan.manifest.as_ref())?),
        BuildMode::Full => None,
    };

    let all_articles = content::load_articles(&content_dir)?;
    let drafts_skipped = all_articles
        .iter()
        .filter(|a| a.front_matter.draft)
        .count();
    let published: Vec<_> = all_articles
        .iter()
        .filter(|a| !a.front_matter.draft)
        .cloned()
        .collect();

    let renderer = MarkdownRenderer::new();
    let outcome = render::process(
        &published,
        &cfg,
        &content_dir,
        &renderer,
        &cache_dir,
        change_set.as_ref(),
    )?;

    let (tags, categories) = render::build_taxonomies(&outcome.articles);
    let dep_graph = graph::build_graph(&outcome.articles);

    let site = Site {
        config: cfg.clone(),
        articles: outcome.articles,
        tags,
        categories,
    };

    if opts.dry_run {
        return Ok(BuildReport {
            mode: plan.mode,
            articles: site.articles.len(),
            drafts_skipped,
            pages_written: 0,
            cached_bodies: outcome.stats.cached,
            rendered_bodies: outcome.stats.rendered,
            graph_nodes: dep_graph.nodes.len(),
            elapsed: start.elapsed(),
            dry_run: true,
        });
    }

    let out_dir = root.join(&cfg.build.output_dir);
    let assets_dir = root.join(&cfg.build.assets_dir);
    let templater = MaudTemplater::new();
    let generator = HtmlGenerator::new(&out_dir, Some(assets_dir), &templater);
    let pages_written = generator.generate(&site, change_set.as_ref())?;

    // Sitemap and feed failures degrade the site but not the build.
    if let Err(e) = feed::write_sitemap(&out_dir, &cfg, &site.articles) {
        eprintln!("warn: sitemap: {e}");
    }
    if let Err(e) = feed::write_feed(&out_dir, &cfg, &site.articles) {
        eprintln!("warn: feed: {e}");
    }

    save_fresh_manifest(&cache_dir, &content_dir, &config_hash)?;

    Ok(BuildReport {
        mode: plan.mode,
        articles: site.articles.len(),
        drafts_skipped,
        pages_written,
        cached_bodies: outcome.stats.cached,
        rendered_bodies: outcome.stats.rendered,
        graph_nodes: dep_graph.nodes.len(),
        elapsed: start.elapsed(),
        dry_run: false,
    })
}

/// Record the just-built state: the config digest plus a digest for every
/// file under the content root, so the next run's detector sees an exact
/// snapshot.
fn save_fresh_manifest(
    cache_dir: &Path,
    content_dir: &Path,
    config_hash: &str,
) -> Result<(), BuildError> {
    let mut manifest = BuildManifest::new(config_hash);
    for (rel, digest) in diff::hash_tree(content_dir)? {
        manifest.insert(rel, digest);
    }
    cache::save_manifest(cache_dir, &manifest)?;
    Ok(())
}

/// Validate config and content without writing any output.
pub fn run_check(root_dir: &Path) -> Result<usize, BuildError> {
    let cfg = config::load_config(root_dir)?;
    let content_dir = root_dir.join(&cfg.build.content_dir);
    let articles = content::load_articles(&content_dir)?;
    Ok(articles.len())
}
