//! In-memory name index: a flat ident-to-ID map paired with a segment
//! tree, always built together from one backing-store snapshot.
//!
//! A built index is immutable. Staleness is handled by building a whole
//! replacement and swapping it in (see [`crate::cache`]), never by
//! editing in place, so readers can hold one without coordination.

#![forbid(unsafe_code)]

mod pattern;
mod tree;

use std::collections::HashMap;

use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use crate::types::DsId;

use pattern::SegmentPattern;
use tree::TreeNode;

/// One match produced by [`NameIndex::find`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FindNode {
    /// Full dotted path from the root.
    pub path: String,
    /// The series ID when a registered name terminates exactly here.
    pub ds_id: Option<DsId>,
    /// Whether deeper names extend this path.
    pub has_children: bool,
}

impl FindNode {
    /// A concrete series callers can fetch.
    pub fn is_leaf(&self) -> bool {
        self.ds_id.is_some()
    }

    /// A prefix callers can drill into. Not exclusive with
    /// [`is_leaf`](Self::is_leaf).
    pub fn is_branch(&self) -> bool {
        self.has_children
    }
}

/// An immutable snapshot of the store's name table.
#[derive(Clone, Debug, Default)]
pub struct NameIndex {
    by_ident: FxHashMap<String, DsId>,
    root: TreeNode,
}

impl NameIndex {
    /// Builds both lookup structures from one record set. A name listed
    /// twice keeps its last ID in both; a single store fetch never
    /// repeats a name, so this only matters for hand-built record lists.
    pub fn build(records: impl IntoIterator<Item = (String, DsId)>) -> Self {
        let mut by_ident = FxHashMap::default();
        let mut root = TreeNode::default();
        for (name, id) in records {
            root.insert(&name, id);
            by_ident.insert(name, id);
        }
        Self { by_ident, root }
    }

    /// Exact identifier resolution: a singleton name-to-ID mapping on a
    /// hit, an empty one on a miss. The map shape leaves room for alias
    /// identifiers that expand to several underlying names.
    pub fn ids_for_ident(&self, ident: &str) -> HashMap<String, DsId> {
        let mut out = HashMap::new();
        if let Some(&id) = self.by_ident.get(ident) {
            out.insert(ident.to_string(), id);
        }
        out
    }

    /// Pattern search over the hierarchy.
    ///
    /// The pattern splits on `.` and each segment filters one tree level
    /// through `*`, `?`, `[...]` globs and `{a,b}` alternation. Returns
    /// every node the final segment reaches, sorted by full path: result
    /// depth always equals pattern depth, and an unmatched pattern is an
    /// empty vec, not an error.
    pub fn find(&self, pattern: &str) -> Vec<FindNode> {
        let segments: SmallVec<[SegmentPattern; 8]> =
            pattern.split('.').map(SegmentPattern::parse).collect();
        let mut active: Vec<&TreeNode> = vec![&self.root];
        for segment in &segments {
            let mut next = Vec::new();
            for node in active {
                for (label, child) in &node.children {
                    if segment.matches(label) {
                        next.push(child);
                    }
                }
            }
            active = next;
            if active.is_empty() {
                break;
            }
        }
        let mut out: Vec<FindNode> = active
            .into_iter()
            .map(|node| FindNode {
                path: node.path.clone(),
                ds_id: node.ds_id,
                has_children: !node.children.is_empty(),
            })
            .collect();
        // BTreeMap walks give per-level order, not full-path order:
        // "a-b.y" sorts before "a.x" ('-' < '.'), yet "a-b" enumerates
        // after "a" inside one level's children.
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.by_ident.len()
    }

    /// Whether the snapshot holds no names.
    pub fn is_empty(&self) -> bool {
        self.by_ident.is_empty()
    }
}
