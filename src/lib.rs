//! # Kiln
//!
//! A static blog generator with an incremental build engine. Markdown files
//! under a content directory become HTML pages; tags, categories, and date
//! archives become listing pages; and every rebuild reuses as much of the
//! previous run's work as it safely can.
//!
//! # Architecture: The Incremental Build Engine
//!
//! Five pieces interlock to make rebuilds correct and fast:
//!
//! ```text
//! 1. Plan      manifest + config hash  →  full | incremental
//! 2. Detect    content tree vs. manifest  →  added/modified/deleted
//! 3. Process   markdown  →  HTML bodies (render cache for unchanged files)
//! 4. Graph     articles  →  tag/category/archive dependency graph
//! 5. Generate  site model  →  write jobs on a bounded worker pool
//! ```
//!
//! The planner consults the manifest store and the config digest to decide
//! whether per-file diffing can be trusted at all; the change detector
//! turns content digests into a change set; the dependency graph answers
//! "what is impacted when this node changes"; and the scheduler turns the
//! site model into one write job per output page, executed concurrently
//! with collect-all-errors semantics.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`cache`] | Content hashing, the persisted build manifest, cached article HTML |
//! | [`diff`] | Change detection: current tree digests vs. the manifest |
//! | [`plan`] | Full-vs-incremental decision and cache invalidation |
//! | [`graph`] | Article/taxonomy dependency graph and impact queries |
//! | [`content`] | Content model, YAML front matter, slugs |
//! | [`render`] | Markdown rendering and the article processing stage |
//! | [`templates`] | Templater collaborator and the default maud templates |
//! | [`generate`] | Write-job expansion and the bounded worker pool |
//! | [`feed`] | sitemap.xml and atom.xml |
//! | [`config`] | `config.toml` loading, defaults, validation, CLI overrides |
//! | [`pipeline`] | The build driver tying the stages together |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Content hashes, not mtimes
//!
//! Change detection compares SHA-256 digests of file contents against the
//! manifest written by the previous build. Modification times are recorded
//! but never trusted for diffing — they don't survive `git checkout`, and a
//! false cache hit is far worse than a redundant render.
//!
//! ## The config digest gates everything
//!
//! A changed `config.toml` can alter every output page (base URL, titles,
//! layout), so the planner compares the config file's digest against the
//! reserved manifest entry and forces a full build — with the cache cleared
//! first — whenever it differs. Per-file diffing only runs when the config
//! is provably unchanged.
//!
//! ## Maud over template engines
//!
//! Pages are rendered with [maud](https://maud.lambda.xyz/): compile-time
//! checked HTML, type-safe interpolation, auto-escaped by default, and no
//! template directory to ship or get out of sync. The [`templates::Templater`]
//! trait keeps the scheduler independent of that choice.
//!
//! ## Let everything finish, report the first failure
//!
//! The generation pool never cancels: a failing page job does not stop the
//! others, and the first error is reported only after every job has run.
//! Successful pages stay on disk. Partial output plus a clear error beats
//! an aborted half-build that must start over.

pub mod cache;
pub mod config;
pub mod content;
pub mod diff;
pub mod feed;
pub mod generate;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod render;
pub mod templates;
