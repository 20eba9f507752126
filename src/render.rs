//! Markdown rendering and the article processing stage.
//!
//! Processing turns each parsed [`Article`] into a [`ProcessedArticle`]:
//! Markdown body rendered to HTML, a summary extracted from the first
//! paragraph, and the output path computed from the article's place in the
//! content tree.
//!
//! ## Renderer collaborator
//!
//! The [`Renderer`] trait is the seam for the Markdown engine: raw text in,
//! safe HTML out. The default [`MarkdownRenderer`] uses pulldown-cmark with
//! the GFM-style extension set (tables, strikethrough, task lists,
//! footnotes) and escapes raw HTML in the source.
//!
//! ## Render cache
//!
//! On incremental builds, an article whose file is in neither the added nor
//! the modified set reuses its cached body from `<cache>/html/<slug>.html`
//! instead of re-running the renderer. Freshly rendered bodies are written
//! back to the cache for the next run. Full builds start from a cleared
//! cache, so every article renders fresh.

use crate::cache::{self, CacheError};
use crate::config::SiteConfig;
use crate::content::{Article, ProcessedArticle, Taxonomy};
use crate::diff::ChangeSet;
use pulldown_cmark::{Options, Parser, html};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum summary length in characters.
const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("render {path}: {message}")]
    Render { path: PathBuf, message: String },
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Markdown-to-HTML collaborator: takes raw source text and returns safe
/// HTML for embedding in a page body.
pub trait Renderer: Sync {
    fn render(&self, source: &str) -> Result<String, String>;
}

/// Default renderer backed by pulldown-cmark.
#[derive(Debug, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &str) -> Result<String, String> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        let parser = Parser::new_ext(source, options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

/// Counters for how the processing stage sourced each article body.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessStats {
    pub cached: usize,
    pub rendered: usize,
}

/// Result of the processing stage.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub articles: Vec<ProcessedArticle>,
    pub stats: ProcessStats,
}

/// Convert raw articles into processed articles.
///
/// `change_set` is the detector's verdict for this run; `None` means a full
/// build (no cache reuse).
pub fn process(
    articles: &[Article],
    config: &SiteConfig,
    content_dir: &Path,
    renderer: &dyn Renderer,
    cache_dir: &Path,
    change_set: Option<&ChangeSet>,
) -> Result<ProcessOutcome, ProcessError> {
    let mut result = Vec::with_capacity(articles.len());
    let mut stats = ProcessStats::default();

    for article in articles {
        let slug = article.slug();
        let rel = article
            .file_path
            .strip_prefix(content_dir)
            .unwrap_or(&article.file_path)
            .to_string_lossy()
            .into_owned();

        let unchanged = change_set.is_some_and(|cs| !cs.touches(&rel));
        let html_content = match cached_body(cache_dir, &slug, unchanged)? {
            Some(cached) => {
                stats.cached += 1;
                cached
            }
            None => {
                let rendered =
                    renderer
                        .render(&article.raw_content)
                        .map_err(|message| ProcessError::Render {
                            path: article.file_path.clone(),
                            message,
                        })?;
                cache::write_cached_html(cache_dir, &slug, &rendered)?;
                stats.rendered += 1;
                rendered
            }
        };

        result.push(ProcessedArticle {
            html_content,
            summary: extract_summary(&article.raw_content, SUMMARY_MAX_CHARS),
            output_path: compute_output_path(article, config, content_dir),
            article: article.clone(),
        });
    }

    Ok(ProcessOutcome {
        articles: result,
        stats,
    })
}

fn cached_body(
    cache_dir: &Path,
    slug: &str,
    unchanged: bool,
) -> Result<Option<String>, CacheError> {
    if !unchanged {
        return Ok(None);
    }
    cache::read_cached_html(cache_dir, slug)
}

/// Collect the distinct tags and categories referenced across the article
/// set, in first-seen order.
pub fn build_taxonomies(articles: &[ProcessedArticle]) -> (Vec<Taxonomy>, Vec<Taxonomy>) {
    let mut tags = Vec::new();
    let mut categories = Vec::new();
    for a in articles {
        for t in &a.front_matter().tags {
            if !tags.iter().any(|x: &Taxonomy| &x.name == t) {
                tags.push(Taxonomy { name: t.clone() });
            }
        }
        for c in &a.front_matter().categories {
            if !categories.iter().any(|x: &Taxonomy| &x.name == c) {
                categories.push(Taxonomy { name: c.clone() });
            }
        }
    }
    (tags, categories)
}

/// Output HTML path for an article: the content-relative directory, then a
/// directory named after the slug (or file stem when no slug is set), then
/// `index.html`, all under the configured output directory.
fn compute_output_path(article: &Article, config: &SiteConfig, content_dir: &Path) -> PathBuf {
    let rel = article
        .file_path
        .strip_prefix(content_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| {
            PathBuf::from(article.file_path.file_name().unwrap_or_default())
        });
    let dir = rel.parent().unwrap_or(Path::new(""));
    let base = if article.front_matter.slug.is_empty() {
        rel.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        article.front_matter.slug.clone()
    };
    Path::new(&config.build.output_dir)
        .join(dir)
        .join(base)
        .join("index.html")
}

/// First paragraph of `content`, truncated to `max_chars` characters with a
/// `...` marker when cut.
fn extract_summary(content: &str, max_chars: usize) -> String {
    let content = content.trim();
    if let Some(idx) = content.find("\n\n")
        && idx > 0
        && idx <= max_chars
    {
        return content[..idx].trim().to_string();
    }
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_chars).collect();
    format!("{truncated}...")
}
