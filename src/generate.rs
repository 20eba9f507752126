//! Page generation: job expansion and the bounded worker pool.
//!
//! The scheduler expands the site model into one [`WriteJob`] per output
//! page — home page, one per article, one per tag, one per category, one
//! per (year, month) archive — and executes the list on a bounded rayon
//! thread pool sized by the configured parallelism.
//!
//! ## Execution contract
//!
//! Jobs are independent: each reads only its own data snapshot and writes
//! only its own output path, so no locking is needed during the write
//! phase. Errors are collected, never fail-fast — a failing job does not
//! stop the others, and the first collected error is returned only after
//! every job has finished. Files written by successful jobs stay on disk
//! regardless of a later job's failure; there is no rollback.
//!
//! After the page jobs complete, static assets are copied recursively into
//! `<out>/assets/`. A missing assets directory is tolerated; any other copy
//! failure is fatal.

use crate::content::{ProcessedArticle, Site};
use crate::diff::ChangeSet;
use crate::templates::{PageData, TemplateError, Templater};
use chrono::Datelike;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("mkdir {path}: {source}")]
    Mkdir { path: PathBuf, source: io::Error },
    #[error("render {template} for {path}: {source}")]
    Render {
        template: String,
        path: PathBuf,
        source: TemplateError,
    },
    #[error("write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("copy assets: {0}")]
    Assets(io::Error),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// One output page: where to write it, which template renders it, and the
/// data snapshot it renders from. Built fresh on every generate call and
/// discarded afterwards.
#[derive(Debug, Clone)]
pub struct WriteJob {
    pub output_path: PathBuf,
    pub template: String,
    pub data: PageData,
}

/// Writes the rendered site to the output directory.
pub struct HtmlGenerator<'a> {
    out_dir: PathBuf,
    assets_dir: Option<PathBuf>,
    templater: &'a dyn Templater,
}

impl<'a> HtmlGenerator<'a> {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        assets_dir: Option<PathBuf>,
        templater: &'a dyn Templater,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            assets_dir,
            templater,
        }
    }

    /// Render and write every page of the site, then copy static assets.
    ///
    /// `_change_set` is accepted per the incremental-build contract but not
    /// consulted for job selection: every page is written on each run.
    /// Returns the number of page jobs executed.
    pub fn generate(
        &self,
        site: &Site,
        _change_set: Option<&ChangeSet>,
    ) -> Result<usize, GenerateError> {
        let parallelism = site.config.build.parallelism.max(1);
        let jobs = self.build_jobs(site);
        let job_count = jobs.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()?;
        let results: Vec<Result<(), GenerateError>> =
            pool.install(|| jobs.par_iter().map(|job| self.write_page(job)).collect());

        // Every job has run to completion; report the first failure, if any.
        if let Some(err) = results.into_iter().find_map(Result::err) {
            return Err(err);
        }

        if let Some(assets_dir) = &self.assets_dir {
            match copy_assets(assets_dir, &self.out_dir.join("assets")) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(GenerateError::Assets(e)),
            }
        }

        Ok(job_count)
    }

    fn build_jobs(&self, site: &Site) -> Vec<WriteJob> {
        let mut jobs = Vec::new();

        // Home page.
        jobs.push(WriteJob {
            output_path: self.out_dir.join("index.html"),
            template: "index.html".into(),
            data: page_for(site, site.articles.clone(), None),
        });

        // Article pages: <out>/posts/<slug>/index.html
        for a in &site.articles {
            jobs.push(WriteJob {
                output_path: self
                    .out_dir
                    .join("posts")
                    .join(a.slug())
                    .join("index.html"),
                template: "article.html".into(),
                data: page_for(site, vec![a.clone()], None),
            });
        }

        // Tag pages: <out>/tags/<name>/index.html
        for tag in &site.tags {
            let matching = filter_articles(&site.articles, |a| {
                a.front_matter().tags.iter().any(|t| t == &tag.name)
            });
            jobs.push(WriteJob {
                output_path: self
                    .out_dir
                    .join("tags")
                    .join(&tag.name)
                    .join("index.html"),
                template: "tag.html".into(),
                data: page_for(site, matching, Some(tag.name.clone())),
            });
        }

        // Category pages: <out>/categories/<name>/index.html
        for cat in &site.categories {
            let matching = filter_articles(&site.articles, |a| {
                a.front_matter().categories.iter().any(|c| c == &cat.name)
            });
            jobs.push(WriteJob {
                output_path: self
                    .out_dir
                    .join("categories")
                    .join(&cat.name)
                    .join("index.html"),
                template: "category.html".into(),
                data: page_for(site, matching, Some(cat.name.clone())),
            });
        }

        // Archive pages: <out>/archives/<year>/<month>/index.html, one per
        // distinct (year, month) pair observed across dated articles.
        let mut archives: BTreeMap<(i32, u32), Vec<ProcessedArticle>> = BTreeMap::new();
        for a in &site.articles {
            if let Some(date) = a.front_matter().date {
                archives
                    .entry((date.year(), date.month()))
                    .or_default()
                    .push(a.clone());
            }
        }
        for ((year, month), articles) in archives {
            jobs.push(WriteJob {
                output_path: self
                    .out_dir
                    .join("archives")
                    .join(format!("{year:04}"))
                    .join(format!("{month:02}"))
                    .join("index.html"),
                template: "archive.html".into(),
                data: page_for(site, articles, Some(format!("{year:04}/{month:02}"))),
            });
        }

        jobs
    }

    fn write_page(&self, job: &WriteJob) -> Result<(), GenerateError> {
        if let Some(parent) = job.output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GenerateError::Mkdir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let bytes = self
            .templater
            .render(&job.template, &job.data)
            .map_err(|source| GenerateError::Render {
                template: job.template.clone(),
                path: job.output_path.clone(),
                source,
            })?;
        std::fs::write(&job.output_path, bytes).map_err(|source| GenerateError::Write {
            path: job.output_path.clone(),
            source,
        })
    }
}

fn page_for(site: &Site, articles: Vec<ProcessedArticle>, heading: Option<String>) -> PageData {
    PageData {
        config: site.config.clone(),
        articles,
        tags: site.tags.clone(),
        categories: site.categories.clone(),
        heading,
    }
}

fn filter_articles(
    articles: &[ProcessedArticle],
    pred: impl Fn(&ProcessedArticle) -> bool,
) -> Vec<ProcessedArticle> {
    articles.iter().filter(|a| pred(a)).cloned().collect()
}

/// Recursively copy all files from `src` into `dst`, creating directories
/// as needed.
pub fn copy_assets(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_assets(&src_path, &dst_path)?;
        } else {
            if let Some(parent) = dst_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{Article, FrontMatter};
    use crate::render;
    use crate::templates::MaudTemplater;
    use chrono::NaiveDate;
    use std::collections::BTreeMap as FileMap;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn processed(
        title: &str,
        tags: &[&str],
        categories: &[&str],
        date: Option<NaiveDate>,
    ) -> ProcessedArticle {
        ProcessedArticle {
            article: Article {
                front_matter: FrontMatter {
                    title: title.to_string(),
                    tags: tags.iter().map(|s| s.to_string()).collect(),
                    categories: categories.iter().map(|s| s.to_string()).collect(),
                    date,
                    ..Default::default()
                },
                raw_content: String::new(),
                file_path: PathBuf::from(format!("{}.md", crate::content::slugify(title))),
                last_modified: SystemTime::UNIX_EPOCH,
            },
            html_content: format!("<p>{title} body</p>"),
            summary: format!("{title} summary"),
            output_path: PathBuf::new(),
        }
    }

    fn site_for(articles: Vec<ProcessedArticle>, parallelism: usize) -> Site {
        let mut config = SiteConfig::default();
        config.site.title = "Test Blog".into();
        config.site.base_url = "https://example.com".into();
        config.build.parallelism = parallelism;
        let (tags, categories) = render::build_taxonomies(&articles);
        Site {
            config,
            articles,
            tags,
            categories,
        }
    }

    fn two_unit_site() -> Site {
        site_for(
            vec![
                processed(
                    "First Post",
                    &["go"],
                    &["tech"],
                    NaiveDate::from_ymd_opt(2024, 6, 1),
                ),
                processed(
                    "Older Post",
                    &["go"],
                    &[],
                    NaiveDate::from_ymd_opt(2024, 1, 1),
                ),
            ],
            4,
        )
    }

    fn read_tree(root: &Path) -> FileMap<PathBuf, Vec<u8>> {
        let mut files = FileMap::new();
        for entry in WalkDir::new(root) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
                files.insert(rel, fs::read(entry.path()).unwrap());
            }
        }
        files
    }

    // =========================================================================
    // Page expansion
    // =========================================================================

    #[test]
    fn generates_expected_page_set() {
        let tmp = TempDir::new().unwrap();
        let site = two_unit_site();
        let templater = MaudTemplater::new();
        let r#gen = HtmlGenerator::new(tmp.path(), None, &templater);

        // home + 2 articles + tag + category + 2 archives
        let pages = r#gen.generate(&site, None).unwrap();
        assert_eq!(pages, 7);

        assert!(tmp.path().join("index.html").exists());
        assert!(tmp.path().join("posts/first-post/index.html").exists());
        assert!(tmp.path().join("posts/older-post/index.html").exists());
        assert!(tmp.path().join("tags/go/index.html").exists());
        assert!(tmp.path().join("categories/tech/index.html").exists());
        assert!(tmp.path().join("archives/2024/06/index.html").exists());
        assert!(tmp.path().join("archives/2024/01/index.html").exists());
    }

    #[test]
    fn tag_page_contains_all_tagged_articles() {
        let tmp = TempDir::new().unwrap();
        let site = two_unit_site();
        let templater = MaudTemplater::new();
        HtmlGenerator::new(tmp.path(), None, &templater)
            .generate(&site, None)
            .unwrap();

        let tag_page = fs::read_to_string(tmp.path().join("tags/go/index.html")).unwrap();
        assert!(tag_page.contains("First Post"));
        assert!(tag_page.contains("Older Post"));
    }

    #[test]
    fn archive_pages_contain_exactly_matching_articles() {
        let tmp = TempDir::new().unwrap();
        let site = two_unit_site();
        let templater = MaudTemplater::new();
        HtmlGenerator::new(tmp.path(), None, &templater)
            .generate(&site, None)
            .unwrap();

        let june = fs::read_to_string(tmp.path().join("archives/2024/06/index.html")).unwrap();
        assert!(june.contains("First Post"));
        assert!(!june.contains("Older Post"));

        let january = fs::read_to_string(tmp.path().join("archives/2024/01/index.html")).unwrap();
        assert!(january.contains("Older Post"));
        assert!(!january.contains("First Post"));
    }

    #[test]
    fn undated_articles_produce_no_archive_page() {
        let tmp = TempDir::new().unwrap();
        let site = site_for(vec![processed("No Date", &[], &[], None)], 2);
        let templater = MaudTemplater::new();
        HtmlGenerator::new(tmp.path(), None, &templater)
            .generate(&site, None)
            .unwrap();

        assert!(!tmp.path().join("archives").exists());
    }

    // =========================================================================
    // Idempotence
    // =========================================================================

    #[test]
    fn repeated_generation_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let site = two_unit_site();
        let templater = MaudTemplater::new();
        let r#gen = HtmlGenerator::new(tmp.path(), None, &templater);

        r#gen.generate(&site, None).unwrap();
        let first = read_tree(tmp.path());

        r#gen.generate(&site, None).unwrap();
        let second = read_tree(tmp.path());

        assert_eq!(first, second);
    }

    // =========================================================================
    // Error aggregation
    // =========================================================================

    /// Fails every render of one template name; delegates the rest.
    struct FailOne {
        inner: MaudTemplater,
        failing_template: &'static str,
    }

    impl Templater for FailOne {
        fn render(&self, template: &str, data: &PageData) -> Result<Vec<u8>, TemplateError> {
            if template == self.failing_template {
                return Err(TemplateError::Render {
                    template: template.to_string(),
                    message: "synthetic failure".into(),
                });
            }
            self.inner.render(template, data)
        }
    }

    #[test]
    fn failing_job_does_not_stop_the_others() {
        let tmp = TempDir::new().unwrap();
        let site = two_unit_site();
        let templater = FailOne {
            inner: MaudTemplater::new(),
            failing_template: "tag.html",
        };
        let r#gen = HtmlGenerator::new(tmp.path(), None, &templater);

        let result = r#gen.generate(&site, None);
        assert!(matches!(result, Err(GenerateError::Render { .. })));

        // All non-failing jobs still produced their files.
        assert!(tmp.path().join("index.html").exists());
        assert!(tmp.path().join("posts/first-post/index.html").exists());
        assert!(tmp.path().join("posts/older-post/index.html").exists());
        assert!(tmp.path().join("categories/tech/index.html").exists());
        assert!(tmp.path().join("archives/2024/06/index.html").exists());
        assert!(!tmp.path().join("tags/go/index.html").exists());
    }

    // =========================================================================
    // Parallelism bounds
    // =========================================================================

    #[test]
    fn zero_parallelism_clamps_to_one_worker() {
        let tmp = TempDir::new().unwrap();
        let site = site_for(vec![processed("Solo", &[], &[], None)], 0);
        let templater = MaudTemplater::new();

        let pages = HtmlGenerator::new(tmp.path(), None, &templater)
            .generate(&site, None)
            .unwrap();
        assert_eq!(pages, 2); // home + article
    }

    // =========================================================================
    // Assets
    // =========================================================================

    #[test]
    fn assets_copied_recursively() {
        let tmp = TempDir::new().unwrap();
        let assets = tmp.path().join("assets-src");
        fs::create_dir_all(assets.join("css")).unwrap();
        fs::write(assets.join("favicon.ico"), "icon").unwrap();
        fs::write(assets.join("css/style.css"), "body {}").unwrap();

        let out = tmp.path().join("out");
        let site = site_for(vec![], 2);
        let templater = MaudTemplater::new();
        HtmlGenerator::new(&out, Some(assets), &templater)
            .generate(&site, None)
            .unwrap();

        assert!(out.join("assets/favicon.ico").exists());
        assert!(out.join("assets/css/style.css").exists());
    }

    #[test]
    fn missing_assets_dir_is_tolerated() {
        let tmp = TempDir::new().unwrap();
        let site = site_for(vec![], 2);
        let templater = MaudTemplater::new();

        let result = HtmlGenerator::new(
            tmp.path().join("out"),
            Some(tmp.path().join("no-such-assets")),
            &templater,
        )
        .generate(&site, None);
        assert!(result.is_ok());
    }

    // =========================================================================
    // Job snapshots
    // =========================================================================

    #[test]
    fn article_jobs_carry_single_article_snapshots() {
        let site = two_unit_site();
        let templater = MaudTemplater::new();
        let r#gen = HtmlGenerator::new("out", None, &templater);

        let jobs = r#gen.build_jobs(&site);
        let article_jobs: Vec<&WriteJob> = jobs
            .iter()
            .filter(|j| j.template == "article.html")
            .collect();
        assert_eq!(article_jobs.len(), 2);
        for job in article_jobs {
            assert_eq!(job.data.articles.len(), 1);
        }
    }

    #[test]
    fn output_paths_are_unique_across_jobs() {
        let site = two_unit_site();
        let templater = MaudTemplater::new();
        let r#gen = HtmlGenerator::new("out", None, &templater);

        let jobs = r#gen.build_jobs(&site);
        let mut paths: Vec<&PathBuf> = jobs.iter().map(|j| &j.output_path).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), jobs.len());
    }
}
