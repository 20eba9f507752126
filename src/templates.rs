//! Page templates and the Templater collaborator.
//!
//! The generation scheduler is template-agnostic: it hands a [`Templater`] a
//! template name and a [`PageData`] snapshot and writes back whatever bytes
//! come out. The default [`MaudTemplater`] renders with
//! [maud](https://maud.lambda.xyz/) — compile-time checked HTML, type-safe
//! interpolation, auto-escaped by default — one function per page kind,
//! dispatched by template name.
//!
//! Template names mirror the page kinds the scheduler emits:
//!
//! | Name            | Page                                  |
//! |-----------------|---------------------------------------|
//! | `index.html`    | Home page, all articles               |
//! | `article.html`  | One article page                      |
//! | `tag.html`      | Articles sharing one tag              |
//! | `category.html` | Articles sharing one category         |
//! | `archive.html`  | Articles from one (year, month) pair  |

use crate::config::SiteConfig;
use crate::content::{ProcessedArticle, Taxonomy};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unknown template: {0}")]
    Unknown(String),
    #[error("template {template}: {message}")]
    Render { template: String, message: String },
}

/// Immutable data snapshot for one page render. Each write job carries its
/// own copy; nothing is shared between concurrent renders.
#[derive(Debug, Clone)]
pub struct PageData {
    pub config: SiteConfig,
    /// Articles visible to this page (all of them for the index, a filtered
    /// subset for taxonomy and archive pages, exactly one for article pages).
    pub articles: Vec<ProcessedArticle>,
    pub tags: Vec<Taxonomy>,
    pub categories: Vec<Taxonomy>,
    /// Listing heading for taxonomy/archive pages (tag name, category name,
    /// or `YYYY/MM`).
    pub heading: Option<String>,
}

/// Template-execution collaborator: template name + data snapshot in,
/// rendered page bytes out.
pub trait Templater: Sync {
    fn render(&self, template: &str, data: &PageData) -> Result<Vec<u8>, TemplateError>;
}

/// Default Templater backed by maud.
#[derive(Debug, Default)]
pub struct MaudTemplater;

impl MaudTemplater {
    pub fn new() -> Self {
        Self
    }
}

impl Templater for MaudTemplater {
    fn render(&self, template: &str, data: &PageData) -> Result<Vec<u8>, TemplateError> {
        let markup = match template {
            "index.html" => render_index(data),
            "article.html" => render_article(data),
            "tag.html" | "category.html" | "archive.html" => render_listing(data),
            other => return Err(TemplateError::Unknown(other.to_string())),
        };
        Ok(markup.into_string().into_bytes())
    }
}

/// URL of an article page.
pub fn article_url(slug: &str) -> String {
    format!("/posts/{slug}/")
}

// ============================================================================
// Page shell
// ============================================================================

fn base_document(data: &PageData, title: &str, content: Markup) -> Markup {
    let site = &data.config.site;
    html! {
        (DOCTYPE)
        html lang=(site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body {
                header.site-header {
                    a.site-title href="/" { (site.title) }
                }
                main { (content) }
            }
        }
    }
}

fn article_list(articles: &[ProcessedArticle]) -> Markup {
    html! {
        ul.article-list {
            @for a in articles {
                li {
                    a href=(article_url(&a.slug())) { (a.front_matter().title) }
                    @if let Some(date) = a.front_matter().date {
                        " "
                        time datetime=(date.format("%Y-%m-%d")) {
                            (date.format("%Y-%m-%d"))
                        }
                    }
                    @if !a.summary.is_empty() {
                        p.summary { (a.summary) }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Page renderers
// ============================================================================

fn render_index(data: &PageData) -> Markup {
    let site = &data.config.site;
    let content = html! {
        @if !site.description.is_empty() {
            p.site-description { (site.description) }
        }
        (article_list(&data.articles))
        @if !data.tags.is_empty() {
            nav.taxonomies {
                h2 { "Tags" }
                ul {
                    @for tag in &data.tags {
                        li { a href={ "/tags/" (tag.name) "/" } { (tag.name) } }
                    }
                }
            }
        }
    };
    base_document(data, &site.title, content)
}

fn render_article(data: &PageData) -> Markup {
    // Article jobs carry exactly one article; an empty snapshot renders an
    // empty shell rather than panicking.
    let Some(a) = data.articles.first() else {
        return base_document(data, &data.config.site.title, html! {});
    };
    let fm = a.front_matter();
    let content = html! {
        article {
            header {
                h1 { (fm.title) }
                @if let Some(date) = fm.date {
                    time datetime=(date.format("%Y-%m-%d")) { (date.format("%Y-%m-%d")) }
                }
                @if !fm.author.is_empty() {
                    span.author { (fm.author) }
                }
                @if !fm.tags.is_empty() {
                    ul.tags {
                        @for tag in &fm.tags {
                            li { a href={ "/tags/" (tag) "/" } { (tag) } }
                        }
                    }
                }
            }
            div.article-body {
                (PreEscaped(a.html_content.as_str()))
            }
        }
    };
    let title = format!("{} - {}", fm.title, data.config.site.title);
    base_document(data, &title, content)
}

fn render_listing(data: &PageData) -> Markup {
    let heading = data.heading.as_deref().unwrap_or_default();
    let content = html! {
        h1 { (heading) }
        (article_list(&data.articles))
    };
    let title = format!("{} - {}", heading, data.config.site.title);
    base_document(data, &title, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Article, FrontMatter};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn config() -> SiteConfig {
        let mut cfg = SiteConfig::default();
        cfg.site.title = "Test Blog".into();
        cfg.site.base_url = "https://example.com".into();
        cfg.site.description = "A test blog".into();
        cfg
    }

    fn processed(title: &str, body_html: &str) -> ProcessedArticle {
        ProcessedArticle {
            article: Article {
                front_matter: FrontMatter {
                    title: title.to_string(),
                    date: NaiveDate::from_ymd_opt(2024, 6, 1),
                    tags: vec!["go".into()],
                    ..Default::default()
                },
                raw_content: String::new(),
                file_path: PathBuf::from("x.md"),
                last_modified: SystemTime::UNIX_EPOCH,
            },
            html_content: body_html.to_string(),
            summary: "Summary text.".into(),
            output_path: PathBuf::new(),
        }
    }

    fn page_data(articles: Vec<ProcessedArticle>, heading: Option<&str>) -> PageData {
        PageData {
            config: config(),
            articles,
            tags: vec![Taxonomy { name: "go".into() }],
            categories: vec![],
            heading: heading.map(str::to_string),
        }
    }

    #[test]
    fn index_lists_articles_and_tags() {
        let data = page_data(vec![processed("Hello World", "<p>x</p>")], None);
        let out = MaudTemplater::new().render("index.html", &data).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Hello World"));
        assert!(html.contains("/posts/hello-world/"));
        assert!(html.contains("/tags/go/"));
        assert!(html.contains("A test blog"));
    }

    #[test]
    fn article_page_embeds_rendered_body() {
        let data = page_data(vec![processed("Post", "<p>rendered <em>body</em></p>")], None);
        let out = MaudTemplater::new().render("article.html", &data).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(html.contains("<p>rendered <em>body</em></p>"));
        assert!(html.contains("<title>Post - Test Blog</title>"));
        assert!(html.contains("2024-06-01"));
    }

    #[test]
    fn listing_page_shows_heading() {
        let data = page_data(vec![processed("Post", "<p>x</p>")], Some("go"));
        let out = MaudTemplater::new().render("tag.html", &data).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(html.contains("<h1>go</h1>"));
        assert!(html.contains("Post"));
    }

    #[test]
    fn unknown_template_is_error() {
        let data = page_data(vec![], None);
        assert!(matches!(
            MaudTemplater::new().render("mystery.html", &data),
            Err(TemplateError::Unknown(_))
        ));
    }

    #[test]
    fn titles_are_escaped() {
        let data = page_data(
            vec![processed("<script>alert('xss')</script>", "<p>x</p>")],
            None,
        );
        let out = MaudTemplater::new().render("index.html", &data).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
