//! Core data structures for the heading hierarchy and the structure graph

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a hierarchy node, stable within one build pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

/// Identifier of a generated content document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(pub String);

impl RefId {
    pub fn new(value: impl Into<String>) -> Self {
        RefId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RefId {
    fn from(value: &str) -> Self {
        RefId(value.to_string())
    }
}

/// What a classified node does in the generated structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Groups children, renders nothing of its own.
    Container,
    /// Renders its own content; may or may not have children.
    Unit,
}

/// A content fragment as delivered by the parsing collaborator.
///
/// Cross-references still name a source anchor here; the generator turns
/// them into [`ContentBlock::CrossRef`] once ref ids exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragment {
    Paragraph { text: String },
    Table { rows: Vec<Vec<String>> },
    Image { asset: String, alt: Option<String> },
    CrossRef { anchor: String, text: String },
}

/// One entry of the flat block stream consumed by the hierarchy builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Heading {
        /// Resolved outline level, 1 = top.
        level: u32,
        classification_key: String,
        title: String,
        anchor: Option<String>,
    },
    Content(Fragment),
}

impl Block {
    pub fn heading(level: u32, classification_key: &str, title: &str) -> Self {
        Block::Heading {
            level,
            classification_key: classification_key.to_string(),
            title: title.to_string(),
            anchor: None,
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Block::Content(Fragment::Paragraph {
            text: text.to_string(),
        })
    }
}

/// A node of the heading tree built from the block stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: NodeId,
    pub title: String,
    /// Literal outline level from the source; 0 only for the synthetic root.
    pub level: u32,
    pub classification_key: String,
    pub anchor: Option<String>,
    /// Index of the originating block; children sort by it.
    pub position: usize,
    /// Material between this heading and its first child heading.
    pub content_blocks: Vec<Fragment>,
    pub role: Option<Role>,
    /// Manufactured by the classifier rather than read from a heading.
    pub synthetic: bool,
}

impl HierarchyNode {
    pub fn root(title: Option<String>) -> Self {
        HierarchyNode {
            id: NodeId(0),
            title: title.unwrap_or_default(),
            level: 0,
            classification_key: String::new(),
            anchor: None,
            position: 0,
            content_blocks: Vec::new(),
            role: None,
            synthetic: true,
        }
    }
}

/// A rendered block inside a generated content document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentBlock {
    Paragraph { text: String },
    Table { rows: Vec<Vec<String>> },
    Image { asset: String, alt: Option<String> },
    CrossRef { target: RefId, text: String },
    /// Marks where a collapsed entry's content starts.
    MergedTitle { title: String, level: u32 },
}

/// The content of a single unit, keyed by its ref id in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub ref_id: RefId,
    pub title: String,
    pub blocks: Vec<ContentBlock>,
}

impl ContentDocument {
    pub fn new(ref_id: RefId, title: impl Into<String>) -> Self {
        ContentDocument {
            ref_id,
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    /// Targets of every cross-reference in this document, in order.
    pub fn cross_refs(&self) -> impl Iterator<Item = &RefId> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::CrossRef { target, .. } => Some(target),
            _ => None,
        })
    }

    /// Point every cross-reference at `to` where `redirect` says so.
    pub fn rewrite_refs(&mut self, mut redirect: impl FnMut(&RefId) -> Option<RefId>) {
        for block in &mut self.blocks {
            if let ContentBlock::CrossRef { target, .. } = block {
                if let Some(to) = redirect(target) {
                    *target = to;
                }
            }
        }
    }
}

/// A node of the exported map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Present for units only.
    pub ref_id: Option<RefId>,
    pub title: String,
    pub classification_key: String,
    pub level: u32,
    pub synthetic: bool,
    pub children: Vec<MapEntry>,
}

impl MapEntry {
    pub fn role(&self) -> Role {
        if self.ref_id.is_some() {
            Role::Unit
        } else {
            Role::Container
        }
    }

    pub fn is_container(&self) -> bool {
        self.ref_id.is_none()
    }

    /// Ref ids of this entry and all of its descendants, pre-order.
    pub fn subtree_refs(&self) -> Vec<RefId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(entry) = stack.pop() {
            if let Some(ref_id) = &entry.ref_id {
                out.push(ref_id.clone());
            }
            stack.extend(entry.children.iter().rev());
        }
        out
    }

    /// Adjust the level of this entry and its whole subtree.
    pub fn shift_levels(&mut self, delta: i64) {
        self.level = (i64::from(self.level) + delta).max(1) as u32;
        for child in &mut self.children {
            child.shift_levels(delta);
        }
    }
}

/// What the parsing collaborator hands over: an ordered block stream plus
/// pass-through assets and metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
    pub assets: BTreeMap<String, Vec<u8>>,
    pub metadata: BTreeMap<String, String>,
}

/// The generated map graph plus everything passed through alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureGraph {
    pub entries: Vec<MapEntry>,
    pub documents: BTreeMap<RefId, ContentDocument>,
    /// Binary assets owned by the parsing collaborator, keyed by reference.
    pub assets: BTreeMap<String, Vec<u8>>,
    pub metadata: BTreeMap<String, String>,
}

impl StructureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visit every entry pre-order with its path and depth (top level = 1).
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&EntryPath, usize, &'a MapEntry)) {
        fn go<'a>(
            entries: &'a [MapEntry],
            path: &mut Vec<usize>,
            visit: &mut impl FnMut(&EntryPath, usize, &'a MapEntry),
        ) {
            for (idx, entry) in entries.iter().enumerate() {
                path.push(idx);
                let entry_path = EntryPath(path.clone());
                visit(&entry_path, path.len(), entry);
                go(&entry.children, path, visit);
                path.pop();
            }
        }
        go(&self.entries, &mut Vec::new(), &mut visit);
    }

    /// Look up an entry by path.
    pub fn entry(&self, path: &EntryPath) -> Option<&MapEntry> {
        let (first, rest) = path.0.split_first()?;
        let mut entry = self.entries.get(*first)?;
        for idx in rest {
            entry = entry.children.get(*idx)?;
        }
        Some(entry)
    }

    /// The sibling list containing `path`, mutably.
    pub fn siblings_mut(&mut self, path: &EntryPath) -> Option<&mut Vec<MapEntry>> {
        let parent = path.parent()?;
        if parent.is_top() {
            return Some(&mut self.entries);
        }
        let (first, rest) = parent.0.split_first()?;
        let mut entry = self.entries.get_mut(*first)?;
        for idx in rest {
            entry = entry.children.get_mut(*idx)?;
        }
        Some(&mut entry.children)
    }

    pub fn entry_mut(&mut self, path: &EntryPath) -> Option<&mut MapEntry> {
        let idx = path.last()?;
        self.siblings_mut(path)?.get_mut(idx)
    }

    /// Deepest entry depth; 0 for an empty graph.
    pub fn max_depth(&self) -> usize {
        let mut depth = 0;
        self.walk(|_, d, _| depth = depth.max(d));
        depth
    }

    /// Ref ids in map order.
    pub fn ref_ids(&self) -> Vec<RefId> {
        let mut out = Vec::new();
        self.walk(|_, _, entry| {
            if let Some(ref_id) = &entry.ref_id {
                out.push(ref_id.clone());
            }
        });
        out
    }

    pub fn unit_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _, entry| {
            if !entry.is_container() {
                count += 1;
            }
        });
        count
    }

    pub fn container_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _, entry| {
            if entry.is_container() {
                count += 1;
            }
        });
        count
    }

    /// Find the path of the entry owning `ref_id`.
    pub fn path_of(&self, ref_id: &RefId) -> Option<EntryPath> {
        let mut found = None;
        self.walk(|path, _, entry| {
            if found.is_none() && entry.ref_id.as_ref() == Some(ref_id) {
                found = Some(path.clone());
            }
        });
        found
    }
}

/// Collapse parameters for the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSpec {
    pub max_depth: Option<u32>,
    pub excluded_classification_keys: BTreeSet<String>,
}

impl ExclusionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn excluding(mut self, key: impl Into<String>) -> Self {
        self.excluded_classification_keys.insert(key.into());
        self
    }

    /// Whether an entry at `depth` (top level = 1) collapses under this spec.
    pub fn collapses(&self, entry: &MapEntry, depth: usize) -> bool {
        self.max_depth.is_some_and(|max| depth > max as usize)
            || self
                .excluded_classification_keys
                .contains(&entry.classification_key)
    }
}

/// Address of an entry: child indices from the top level, 0-based.
///
/// Displayed and parsed 1-based and dot-separated (`1.2.3`), the way an
/// outline numbers its headings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryPath(pub Vec<usize>);

impl EntryPath {
    pub fn top(idx: usize) -> Self {
        EntryPath(vec![idx])
    }

    /// The empty path, standing for the top level itself.
    pub fn is_top(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn parent(&self) -> Option<EntryPath> {
        if self.0.is_empty() {
            return None;
        }
        Some(EntryPath(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn child(&self, idx: usize) -> EntryPath {
        let mut inner = self.0.clone();
        inner.push(idx);
        EntryPath(inner)
    }

    pub fn with_last(&self, idx: usize) -> EntryPath {
        let mut inner = self.0.clone();
        if let Some(last) = inner.last_mut() {
            *last = idx;
        }
        EntryPath(inner)
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| (i + 1).to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for EntryPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut inner = Vec::new();
        for part in s.trim().split('.') {
            let n: usize = part
                .parse()
                .map_err(|_| format!("invalid path segment '{}' in '{}'", part, s))?;
            if n == 0 {
                return Err(format!("path segments are 1-based: '{}'", s));
            }
            inner.push(n - 1);
        }
        Ok(EntryPath(inner))
    }
}
