//! Segment tree over dotted names.

use std::collections::BTreeMap;

use crate::types::DsId;

/// One unique name prefix. A node is a leaf when some name terminates
/// here (`ds_id` set) and a branch when children hang below; both at
/// once is legal (`a.b` registered alongside `a.b.c`).
#[derive(Clone, Debug, Default)]
pub(crate) struct TreeNode {
    /// Full dotted path from the root; empty only on the root itself.
    pub(crate) path: String,
    /// Set when a registered name terminates exactly here.
    pub(crate) ds_id: Option<DsId>,
    /// Child nodes keyed by their final segment.
    pub(crate) children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    /// Walks the chain of nodes for `name`, creating missing links, and
    /// marks the final node as a leaf carrying `id`. Re-inserting a name
    /// overwrites its ID; intermediate nodes are left untouched.
    pub(crate) fn insert(&mut self, name: &str, id: DsId) {
        let mut node = self;
        for (depth, part) in name.split('.').enumerate() {
            let path = if depth == 0 {
                part.to_string()
            } else {
                format!("{}.{}", node.path, part)
            };
            node = node
                .children
                .entry(part.to_string())
                .or_insert_with(|| TreeNode { path, ..TreeNode::default() });
        }
        node.ds_id = Some(id);
    }
}
