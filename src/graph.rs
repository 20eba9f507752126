//! Article/taxonomy dependency graph and impact propagation.
//!
//! Every article participates in derived pages — its tags, its categories,
//! its archive year. The graph records those links so that a change to one
//! node can be translated into the set of pages that must be regenerated:
//!
//! ```text
//! posts/hello.md ──→ tag:go
//!                ──→ category:tech
//!                ──→ archive:2024
//! ```
//!
//! Node keys are either a content file path or a synthetic key
//! (`tag:<name>`, `category:<name>`, `archive:<year>`). Edges are kept
//! consistent in both directions: recording `from → to` updates the
//! adjacency list, `from`'s dependencies, and `to`'s dependents, all with
//! set semantics.

use crate::content::ProcessedArticle;
use crate::diff::ChangeSet;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph diff requires both graphs to be present")]
    MissingGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Article,
    Tag,
    Category,
    Archive,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub key: String,
    pub kind: NodeKind,
    /// Source file mtime for articles; synthetic nodes have none.
    pub last_modified: Option<SystemTime>,
    /// Outgoing edges (what this node depends on).
    pub dependencies: Vec<String>,
    /// Incoming edges (what depends on this node).
    pub dependents: Vec<String>,
}

impl Node {
    pub fn new(key: impl Into<String>, kind: NodeKind, last_modified: Option<SystemTime>) -> Self {
        Self {
            key: key.into(),
            kind,
            last_modified,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub nodes: HashMap<String, Node>,
    pub edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node if it does not already exist. Inserting an existing
    /// key is a no-op — it never overwrites.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.entry(node.key.clone()).or_insert(node);
    }

    /// Record a directed edge `from → to`, updating the adjacency list and
    /// both endpoints' dependency/dependent lists. Duplicate edges are
    /// ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        push_unique(self.edges.entry(from.to_string()).or_default(), to);
        if let Some(n) = self.nodes.get_mut(to) {
            push_unique(&mut n.dependents, from);
        }
        if let Some(n) = self.nodes.get_mut(from) {
            push_unique(&mut n.dependencies, to);
        }
    }

    /// All node keys transitively impacted when `changed_key` changes:
    /// the key itself plus every transitive dependent.
    ///
    /// The traversal carries a visited set, so it terminates (and returns
    /// each key once) even if the graph somehow contains a cycle.
    pub fn impact(&self, changed_key: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![changed_key.to_string()];

        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&key) {
                for dep in node.dependents.iter().rev() {
                    if !visited.contains(dep) {
                        stack.push(dep.clone());
                    }
                }
            }
            result.push(key);
        }
        result
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Key for a tag node.
pub fn tag_key(name: &str) -> String {
    format!("tag:{name}")
}

/// Key for a category node.
pub fn category_key(name: &str) -> String {
    format!("category:{name}")
}

/// Key for an archive (year) node.
pub fn archive_key(year: i32) -> String {
    format!("archive:{year}")
}

/// Build the dependency graph for a set of processed articles, linking each
/// article to its tag, category, and archive-year nodes.
pub fn build_graph(articles: &[ProcessedArticle]) -> DependencyGraph {
    let mut g = DependencyGraph::new();
    for a in articles {
        let article_path = a.article.file_path.to_string_lossy().into_owned();
        g.add_node(Node::new(
            article_path.clone(),
            NodeKind::Article,
            Some(a.article.last_modified),
        ));
        for tag in &a.front_matter().tags {
            let key = tag_key(tag);
            g.add_node(Node::new(key.clone(), NodeKind::Tag, None));
            g.add_edge(&article_path, &key);
        }
        for cat in &a.front_matter().categories {
            let key = category_key(cat);
            g.add_node(Node::new(key.clone(), NodeKind::Category, None));
            g.add_edge(&article_path, &key);
        }
        if let Some(date) = a.front_matter().date {
            use chrono::Datelike;
            let key = archive_key(date.year());
            g.add_node(Node::new(key.clone(), NodeKind::Archive, None));
            g.add_edge(&article_path, &key);
        }
    }
    g
}

/// Node-set comparison between two full graphs.
///
/// Keys only in `new` are added, keys only in `old` are deleted, and keys
/// present in both are reported as modified. The both-present case is
/// deliberately conservative: edge-set differences are not distinguished
/// from no-ops.
pub fn graph_diff(
    old: Option<&DependencyGraph>,
    new: Option<&DependencyGraph>,
) -> Result<ChangeSet, GraphError> {
    let (old, new) = match (old, new) {
        (Some(o), Some(n)) => (o, n),
        _ => return Err(GraphError::MissingGraph),
    };

    let mut cs = ChangeSet::default();
    for key in new.nodes.keys() {
        if old.nodes.contains_key(key) {
            cs.modified.insert(key.clone());
        } else {
            cs.added.insert(key.clone());
        }
    }
    for key in old.nodes.keys() {
        if !new.nodes.contains_key(key) {
            cs.deleted.insert(key.clone());
        }
    }
    Ok(cs)
}
