//! Content model and front-matter parsing.
//!
//! A site is a tree of Markdown files under the content root. Each file may
//! open with a YAML front matter block delimited by `---` lines; the rest of
//! the file is the raw Markdown body. The types here are shared by every
//! later stage of the pipeline:
//!
//! - [`Article`]: one parsed content file, immutable for the rest of the build
//! - [`ProcessedArticle`]: an article plus its rendered HTML, summary, and
//!   computed output path (produced by [`crate::render::process`])
//! - [`Site`]: the complete in-memory model handed to the generation stage
//!
//! ## Front matter
//!
//! ```text
//! ---
//! title: Hello World
//! date: 2024-06-01
//! tags: [go, web]
//! categories: [tech]
//! ---
//! Body starts here.
//! ```
//!
//! A file with no leading `---` is all body. An opening `---` with no closing
//! delimiter is also treated as all body (the file is not rejected). Malformed
//! YAML inside a well-delimited block is a fatal parse error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Metadata block at the top of a content file. Every field is optional;
/// missing fields take their zero value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrontMatter {
    pub title: String,
    pub slug: String,
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub draft: bool,
    pub description: String,
    pub author: String,
    /// Template override for this article (empty = the default article template).
    pub template: String,
}

/// One content file as parsed from disk. Immutable for the duration of a build.
#[derive(Debug, Clone)]
pub struct Article {
    pub front_matter: FrontMatter,
    pub raw_content: String,
    pub file_path: PathBuf,
    pub last_modified: SystemTime,
}

impl Article {
    /// URL slug: explicit front-matter slug when set, otherwise the
    /// slugified title.
    pub fn slug(&self) -> String {
        if self.front_matter.slug.is_empty() {
            slugify(&self.front_matter.title)
        } else {
            self.front_matter.slug.clone()
        }
    }
}

/// An article after the processing stage: rendered body, extracted summary,
/// and the output path it will be written to. Consumed read-only.
#[derive(Debug, Clone)]
pub struct ProcessedArticle {
    pub article: Article,
    pub html_content: String,
    pub summary: String,
    pub output_path: PathBuf,
}

impl ProcessedArticle {
    pub fn slug(&self) -> String {
        self.article.slug()
    }

    pub fn front_matter(&self) -> &FrontMatter {
        &self.article.front_matter
    }
}

/// A tag or category: a grouping dimension that becomes an output page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
}

/// The complete site model handed to the generation scheduler.
#[derive(Debug, Clone)]
pub struct Site {
    pub config: crate::config::SiteConfig,
    pub articles: Vec<ProcessedArticle>,
    pub tags: Vec<Taxonomy>,
    pub categories: Vec<Taxonomy>,
}

/// Parse a single content file into an [`Article`].
pub fn parse_article(file_path: &Path) -> Result<Article, ContentError> {
    let data = std::fs::read_to_string(file_path)?;
    let meta = std::fs::metadata(file_path)?;
    let last_modified = meta.modified()?;

    let (front_matter, body) =
        split_front_matter(&data).map_err(|source| ContentError::FrontMatter {
            path: file_path.to_path_buf(),
            source,
        })?;

    Ok(Article {
        front_matter,
        raw_content: body,
        file_path: file_path.to_path_buf(),
        last_modified,
    })
}

/// Walk `content_dir` recursively and parse every Markdown file
/// (`.md` or `.markdown`, case-insensitive).
pub fn load_articles(content_dir: &Path) -> Result<Vec<Article>, ContentError> {
    let mut articles = Vec::new();
    for entry in WalkDir::new(content_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .map(|e| {
                e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown")
            })
            .unwrap_or(false);
        if !is_markdown {
            continue;
        }
        articles.push(parse_article(entry.path())?);
    }
    Ok(articles)
}

/// Separate a YAML front matter block from the Markdown body.
///
/// Front matter must start on the very first line as `---` and end with a
/// subsequent `---` line. When no valid block is found the entire content is
/// returned as the body unchanged.
fn split_front_matter(data: &str) -> Result<(FrontMatter, String), serde_yaml::Error> {
    let lines: Vec<&str> = data.split('\n').collect();
    if lines.is_empty() || lines[0].trim_end_matches('\r') != "---" {
        return Ok((FrontMatter::default(), data.to_string()));
    }

    let closing = lines[1..]
        .iter()
        .position(|l| l.trim_end_matches('\r') == "---")
        .map(|i| i + 1);

    let Some(closing_idx) = closing else {
        // No closing delimiter: the whole file is body.
        return Ok((FrontMatter::default(), data.to_string()));
    };

    let yaml = lines[1..closing_idx].join("\n");
    let fm = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(&yaml)?
    };
    let body = lines[closing_idx + 1..].join("\n");
    Ok((fm, body))
}

/// Convert `s` to a lowercase hyphen-separated URL slug.
///
/// Spaces and underscores become hyphens; any other character that is not
/// ASCII alphanumeric or a hyphen is dropped.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            ' ' | '_' => out.push('-'),
            'a'..='z' | '0'..='9' | '-' => out.push(c),
            _ => {}
        }
    }
    out
}
