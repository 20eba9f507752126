//! CLI output formatting for build results.
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::plan::BuildMode;
use std::time::Duration;

/// Summary of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub articles: usize,
    pub drafts_skipped: usize,
    pub pages_written: usize,
    /// Article bodies served from the render cache vs. rendered fresh.
    pub cached_bodies: usize,
    pub rendered_bodies: usize,
    pub graph_nodes: usize,
    pub elapsed: Duration,
    pub dry_run: bool,
}

/// Format a build report as display lines.
///
/// ```text
/// build: 12 articles, 19 pages, incremental (10 cached, 2 rendered), 0.8s
/// ```
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    if report.drafts_skipped > 0 {
        lines.push(format!(
            "skipped {} draft{}",
            report.drafts_skipped,
            plural(report.drafts_skipped)
        ));
    }

    let elapsed = format!("{:.1}s", report.elapsed.as_secs_f64());
    if report.dry_run {
        lines.push(format!(
            "dry-run: {} article{}, {} mode, {}",
            report.articles,
            plural(report.articles),
            report.mode,
            elapsed
        ));
        return lines;
    }

    let cache_note = if report.cached_bodies > 0 {
        format!(
            " ({} cached, {} rendered)",
            report.cached_bodies, report.rendered_bodies
        )
    } else {
        String::new()
    };
    lines.push(format!(
        "build: {} article{}, {} page{}, {}{}, {}",
        report.articles,
        plural(report.articles),
        report.pages_written,
        plural(report.pages_written),
        report.mode,
        cache_note,
        elapsed
    ));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{line}");
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
