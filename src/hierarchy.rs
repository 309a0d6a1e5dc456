//! Brite hierarchy flattening.
//!
//! A brite JSON document is a tree of `{"name": ..., "children": [...]}`
//! objects. [`flatten`] walks it and records, for every node accepted by a
//! qualifier, the chain of ancestor names above it. [`build_edges`] turns
//! those chains back into a deduplicated parent/child edge list.
//!
//! The same leaf can sit under several parents, so each identifier maps to a
//! set of [`BritePath`]s rather than a single one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::KeggError;

pub const PATH_DELIMITER: char = '|';

/// KO leaves: `K00001 alcohol dehydrogenase ...`.
pub const KO_NODE_PATTERN: &str = r"^K\d{5} ";
/// Generic brite entries: an optional one or two character prefix, five digits, a space.
pub const BRITE_NODE_PATTERN: &str = r"^\w?\w?\d{5} ";

static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \[.*\]$").unwrap());
static SHORT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w?\w?\d{5}) ").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    pub name: String,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<HierarchyNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Converts a brite JSON document. Every node must be an object with a
    /// string `name`; `children`, when present, must be an array.
    pub fn from_json(value: &Value) -> Result<Self, KeggError> {
        Self::from_json_at(value, "$")
    }

    fn from_json_at(value: &Value, location: &str) -> Result<Self, KeggError> {
        let object = value
            .as_object()
            .ok_or_else(|| KeggError::Structure(format!("{location} is not an object")))?;
        let name = object
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| KeggError::Structure(format!("{location} has no string `name`")))?
            .to_string();
        let children = match object.get("children") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    Self::from_json_at(item, &format!("{location}.children[{index}]"))
                })
                .collect::<Result<Vec<_>, KeggError>>()?,
            Some(_) => {
                return Err(KeggError::Structure(format!(
                    "{location}.children is not an array"
                )));
            }
        };
        Ok(Self { name, children })
    }
}

/// Ancestor names of a node, outermost first, root excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BritePath(Vec<String>);

impl BritePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BritePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, "{PATH_DELIMITER}")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for BritePath {
    type Err = KeggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(value.split(PATH_DELIMITER).map(str::to_string).collect()))
    }
}

/// Identifier to every distinct ancestor chain it was reached through.
pub type LeafPaths = BTreeMap<String, BTreeSet<BritePath>>;

#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    /// Prepended to every recorded identifier, e.g. `ko:`.
    pub prefix: String,
    /// Keep only the first `n` ancestor segments.
    pub max_depth: Option<usize>,
}

/// Returns a qualifier accepting names that match `pattern`.
pub fn pattern_qualifier(pattern: Regex) -> impl Fn(&str) -> bool {
    move |name| pattern.is_match(name)
}

pub fn ko_qualifier() -> impl Fn(&str) -> bool {
    pattern_qualifier(Regex::new(KO_NODE_PATTERN).unwrap())
}

pub fn brite_qualifier() -> impl Fn(&str) -> bool {
    pattern_qualifier(Regex::new(BRITE_NODE_PATTERN).unwrap())
}

/// Drops a trailing ` [...]` annotation (`[EC:1.1.1.1]`, `[PATH:ko00010]`).
pub fn strip_annotation(name: &str) -> &str {
    match ANNOTATION.find(name) {
        Some(found) => &name[..found.start()],
        None => name,
    }
}

fn identifier_of(cleaned: &str) -> &str {
    cleaned.split_whitespace().next().unwrap_or("")
}

/// Walks `root` depth first. The root itself contributes no path segment and
/// is never recorded; qualification is checked against the raw node name.
pub fn flatten<F>(root: &HierarchyNode, qualifies: F, options: &FlattenOptions) -> LeafPaths
where
    F: Fn(&str) -> bool,
{
    let mut out = LeafPaths::new();
    let mut path = Vec::new();
    for child in &root.children {
        visit(child, &qualifies, options, &mut path, &mut out);
    }
    out
}

/// [`HierarchyNode::from_json`] followed by [`flatten`].
pub fn flatten_json<F>(
    document: &Value,
    qualifies: F,
    options: &FlattenOptions,
) -> Result<LeafPaths, KeggError>
where
    F: Fn(&str) -> bool,
{
    let root = HierarchyNode::from_json(document)?;
    Ok(flatten(&root, qualifies, options))
}

fn visit<F>(
    node: &HierarchyNode,
    qualifies: &F,
    options: &FlattenOptions,
    path: &mut Vec<String>,
    out: &mut LeafPaths,
) where
    F: Fn(&str) -> bool,
{
    let cleaned = strip_annotation(&node.name);
    if qualifies(&node.name) {
        let id = identifier_of(cleaned);
        if !id.is_empty() {
            let keep = options.max_depth.unwrap_or(path.len()).min(path.len());
            out.entry(format!("{}{id}", options.prefix))
                .or_default()
                .insert(BritePath(path[..keep].to_vec()));
        }
    }

    path.push(cleaned.to_string());
    for child in &node.children {
        visit(child, qualifies, options, path, out);
    }
    path.pop();
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

impl Edge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// Optional renaming of path segments before edges are formed.
pub trait LabelResolver {
    fn resolve(&self, label: &str) -> Option<String>;
}

impl LabelResolver for HashMap<String, String> {
    fn resolve(&self, label: &str) -> Option<String> {
        self.get(label).cloned()
    }
}

impl LabelResolver for BTreeMap<String, String> {
    fn resolve(&self, label: &str) -> Option<String> {
        self.get(label).cloned()
    }
}

/// Reduces `"09100 Metabolism"` to `"09100"`; other labels are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortCodeLabels;

impl LabelResolver for ShortCodeLabels {
    fn resolve(&self, label: &str) -> Option<String> {
        SHORT_CODE
            .captures(label)
            .map(|caps| caps[1].to_string())
    }
}

pub fn build_edges(paths: &LeafPaths) -> BTreeSet<Edge> {
    collect_edges(paths, |label| label.to_string())
}

pub fn build_edges_with(paths: &LeafPaths, resolver: &dyn LabelResolver) -> BTreeSet<Edge> {
    collect_edges(paths, |label| {
        resolver.resolve(label).unwrap_or_else(|| label.to_string())
    })
}

fn collect_edges<M>(paths: &LeafPaths, rename: M) -> BTreeSet<Edge>
where
    M: Fn(&str) -> String,
{
    let mut edges = BTreeSet::new();
    for (id, chains) in paths {
        for chain in chains {
            if chain.is_empty() {
                continue;
            }
            let mut nodes = chain
                .segments()
                .iter()
                .map(|segment| rename(segment))
                .collect::<Vec<_>>();
            nodes.push(id.clone());
            for pair in nodes.windows(2) {
                edges.insert(Edge::new(pair[0].clone(), pair[1].clone()));
            }
        }
    }
    edges
}
