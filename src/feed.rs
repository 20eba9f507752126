//! Sitemap and Atom feed output.
//!
//! Both files are written into the output root after page generation. The
//! driver treats failures here as warnings, not build failures — a site
//! with a broken feed is still a site.

use crate::config::SiteConfig;
use crate::content::ProcessedArticle;
use crate::templates::article_url;
use atom_syndication::{Entry, Feed, Link, Person, Text};
use chrono::{DateTime, NaiveTime, Utc};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Write `sitemap.xml` listing every article URL.
pub fn write_sitemap(
    out_dir: &Path,
    config: &SiteConfig,
    articles: &[ProcessedArticle],
) -> Result<(), FeedError> {
    let base_url = &config.site.base_url;
    let mut buf = String::new();
    buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    buf.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for a in articles {
        buf.push_str(&format!(
            "  <url><loc>{}{}</loc></url>\n",
            base_url,
            article_url(&a.slug())
        ));
    }
    buf.push_str("</urlset>\n");

    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join("sitemap.xml"), buf)?;
    Ok(())
}

/// Write `atom.xml` with one entry per article.
///
/// The feed's `updated` stamp is the most recent article date, keeping
/// repeated builds of an unchanged site byte-identical.
pub fn write_feed(
    out_dir: &Path,
    config: &SiteConfig,
    articles: &[ProcessedArticle],
) -> Result<(), FeedError> {
    let base_url = &config.site.base_url;

    let mut feed = Feed::default();
    feed.set_title(Text::plain(config.site.title.clone()));
    if !config.site.description.is_empty() {
        feed.set_subtitle(Text::plain(config.site.description.clone()));
    }
    feed.set_id(base_url.clone());
    feed.set_links(vec![Link {
        href: format!("{base_url}/atom.xml"),
        rel: "self".to_string(),
        mime_type: Some("application/atom+xml".to_string()),
        ..Default::default()
    }]);

    let latest = articles
        .iter()
        .filter_map(|a| a.front_matter().date)
        .max()
        .map(midnight_utc)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    feed.set_updated(latest);

    let mut entries = Vec::with_capacity(articles.len());
    for a in articles {
        let fm = a.front_matter();
        let url = format!("{}{}", base_url, article_url(&a.slug()));

        let mut entry = Entry::default();
        entry.set_title(Text::plain(fm.title.clone()));
        entry.set_id(url.clone());
        entry.set_links(vec![Link {
            href: url,
            rel: "alternate".to_string(),
            mime_type: Some("text/html".to_string()),
            ..Default::default()
        }]);
        if !a.summary.is_empty() {
            entry.set_summary(Text::plain(a.summary.clone()));
        }
        if !fm.author.is_empty() {
            entry.set_authors(vec![Person {
                name: fm.author.clone(),
                ..Default::default()
            }]);
        }
        if let Some(date) = fm.date {
            let stamp = midnight_utc(date);
            entry.set_published(Some(stamp.into()));
            entry.set_updated(stamp);
        }
        entries.push(entry);
    }
    feed.set_entries(entries);

    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join("atom.xml"), feed.to_string())?;
    Ok(())
}

fn midnight_utc(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
