//! Dependency tree storage and algebra
//!
//! Nodes live in an arena owned by [`Tree`]. Children are ordered lists of
//! [`NodeId`]s and the parent link is a plain index used for upward walks
//! only; equality and flattening never follow it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::Index;

use super::sort::natural_cmp;
use super::spec::NodeSpec;
use super::status::Status;
use crate::models::ResourceKind;

/// Extras key holding the node status
pub const STATUS_KEY: &str = "status";
/// Extras key holding a short informational string
pub const INFO_KEY: &str = "info";

/// Per-node annotations
pub type Extras = BTreeMap<String, String>;

/// Handle to a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: ResourceKind,
    pub id: String,
    pub extras: Extras,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl TreeNode {
    fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        let mut extras = Extras::new();
        extras.insert(STATUS_KEY.to_string(), Status::Ok.as_str().to_string());
        Self {
            kind,
            id: id.into(),
            extras,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// A placeholder with neither kind nor id
    pub fn is_blank(&self) -> bool {
        self.kind.is_blank() && self.id.is_empty()
    }

    pub fn status(&self) -> Option<Status> {
        self.extras.get(STATUS_KEY).and_then(|s| Status::parse_optional(s))
    }

    pub fn set_status(&mut self, status: Status) {
        self.extras
            .insert(STATUS_KEY.to_string(), status.as_str().to_string());
    }

    pub fn info(&self) -> Option<&str> {
        self.extras.get(INFO_KEY).map(|s| s.as_str())
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.extras.insert(INFO_KEY.to_string(), info.into());
    }

    fn matches(&self, kind: &ResourceKind, id: &str) -> bool {
        &self.kind == kind && self.id == id
    }
}

/// Arena-backed dependency tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl Tree {
    /// Create a tree holding a single root node
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            nodes: vec![TreeNode::new(kind, id)],
            root: NodeId(0),
        }
    }

    /// Create a tree whose root is a blank placeholder
    pub fn blank() -> Self {
        Self::new(ResourceKind::NONE, "")
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Allocate a node that is not yet attached anywhere
    pub fn new_node(&mut self, kind: ResourceKind, id: impl Into<String>) -> NodeId {
        self.nodes.push(TreeNode::new(kind, id));
        NodeId(self.nodes.len() - 1)
    }

    /// Append `child` to `parent` and point it back at its parent
    ///
    /// No uniqueness check is made; callers dedupe with [`Tree::find`] or
    /// [`Tree::find_child`] first.
    pub fn add(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Allocate and attach in one step
    pub fn add_new(
        &mut self,
        parent: NodeId,
        kind: ResourceKind,
        id: impl Into<String>,
    ) -> NodeId {
        let child = self.new_node(kind, id);
        self.add(parent, child);
        child
    }

    /// Return the child matching kind/id, creating it when missing
    pub fn find_or_add(&mut self, parent: NodeId, kind: ResourceKind, id: &str) -> NodeId {
        match self.find_child(parent, &kind, id) {
            Some(n) => n,
            None => self.add_new(parent, kind, id),
        }
    }

    /// Depth-first search from `from`, checking `from` itself first
    pub fn find(&self, from: NodeId, kind: &ResourceKind, id: &str) -> Option<NodeId> {
        let node = &self.nodes[from.0];
        if node.matches(kind, id) {
            return Some(from);
        }
        node.children
            .iter()
            .find_map(|c| self.find(*c, kind, id))
    }

    /// Look for a direct child only
    pub fn find_child(&self, parent: NodeId, kind: &ResourceKind, id: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].matches(kind, id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn count_children(&self, id: NodeId) -> usize {
        self.nodes[id.0].children.len()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_leaf()
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes[id.0].parent.is_none()
    }

    /// Walk parent links up to the topmost ancestor
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut nav = id;
        while let Some(p) = self.nodes[nav.0].parent {
            nav = p;
        }
        nav
    }

    /// Number of ancestors above `id`
    pub fn level(&self, id: NodeId) -> usize {
        let mut level = 0;
        let mut nav = self.nodes[id.0].parent;
        while let Some(p) = nav {
            level += 1;
            nav = self.nodes[p.0].parent;
        }
        level
    }

    /// Deepest level reachable below `id`, counting from `depth`
    pub fn max_depth(&self, id: NodeId, depth: usize) -> usize {
        self.nodes[id.0]
            .children
            .iter()
            .map(|c| self.max_depth(*c, depth + 1))
            .fold(depth, usize::max)
    }

    /// Count descendants of the root with the given kind, or all of them
    /// when `kind` is blank
    ///
    /// The root itself is never counted. It stands for the listing and
    /// usually shares the kind being counted, so `count(&kind)` is the
    /// number of rendered objects rather than that number plus one.
    pub fn count(&self, kind: &ResourceKind) -> usize {
        self.count_under(self.root, kind)
    }

    fn count_under(&self, id: NodeId, kind: &ResourceKind) -> usize {
        self.nodes[id.0]
            .children
            .iter()
            .map(|c| {
                let hit = usize::from(kind.is_blank() || &self.nodes[c.0].kind == kind);
                hit + self.count_under(*c, kind)
            })
            .sum()
    }

    /// Whether `id` or one of its ancestors groups the given namespace
    pub fn in_namespace(&self, id: NodeId, ns_id: &str) -> bool {
        let mut nav = Some(id);
        while let Some(n) = nav {
            let node = &self.nodes[n.0];
            if node.kind == ResourceKind::NAMESPACE && node.id == ns_id {
                return true;
            }
            nav = node.parent;
        }
        false
    }

    /// Drop every descendant of the root
    pub fn clear(&mut self) {
        let mut root = self.nodes[self.root.0].clone();
        root.children.clear();
        root.parent = None;
        self.nodes = vec![root];
        self.root = NodeId(0);
    }

    /// Copy of the root without any children
    pub fn shallow_clone(&self) -> Tree {
        let mut root = self.nodes[self.root.0].clone();
        root.children.clear();
        root.parent = None;
        Tree {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Order every sibling list by natural order of node ids
    pub fn sort(&mut self) {
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            let mut kids = std::mem::take(&mut self.nodes[n.0].children);
            kids.sort_by(|a, b| natural_cmp(&self.nodes[a.0].id, &self.nodes[b.0].id));
            stack.extend(kids.iter().copied());
            self.nodes[n.0].children = kids;
        }
    }

    /// Leaf-to-root chain for `id`
    pub fn spec(&self, id: NodeId) -> NodeSpec {
        let mut spec = NodeSpec::default();
        let mut nav = Some(id);
        while let Some(n) = nav {
            let node = &self.nodes[n.0];
            spec.kinds.push(node.kind.clone());
            spec.ids.push(node.id.clone());
            spec.extras.push(node.extras.clone());
            nav = node.parent;
        }
        spec
    }

    /// One spec per leaf below the root, in children order
    pub fn flatten(&self) -> Vec<NodeSpec> {
        let mut specs = Vec::new();
        self.flatten_into(self.root, &mut specs);
        specs
    }

    fn flatten_into(&self, id: NodeId, specs: &mut Vec<NodeSpec>) {
        for c in &self.nodes[id.0].children {
            if self.is_leaf(*c) {
                specs.push(self.spec(*c));
            } else {
                self.flatten_into(*c, specs);
            }
        }
    }

    /// Rebuild a tree from flattened specs
    ///
    /// Each spec is stitched in root component first, reusing nodes already
    /// present on the current path.
    pub fn hydrate(specs: &[NodeSpec]) -> Tree {
        let mut tree = Tree::blank();
        let root = tree.root;
        for spec in specs {
            let mut nav = root;
            for i in (0..spec.len()).rev() {
                let (kind, id, extras) = (&spec.kinds[i], &spec.ids[i], &spec.extras[i]);
                if tree.nodes[nav.0].is_blank() {
                    let node = &mut tree.nodes[nav.0];
                    node.kind = kind.clone();
                    node.id = id.clone();
                    node.extras = extras.clone();
                    continue;
                }
                if tree.nodes[nav.0].matches(kind, id) {
                    continue;
                }
                nav = match tree.find_child(nav, kind, id) {
                    Some(n) => n,
                    None => {
                        let c = tree.add_new(nav, kind.clone(), id.as_str());
                        tree.nodes[c.0].extras = extras.clone();
                        c
                    }
                };
            }
        }
        tree
    }

    /// Keep only the branches whose joined path satisfies `predicate`
    ///
    /// Returns `None` when nothing matched.
    pub fn filter<F>(&self, query: &str, predicate: F) -> Option<Tree>
    where
        F: Fn(&str, &str) -> bool,
    {
        let matches: Vec<NodeSpec> = self
            .flatten()
            .into_iter()
            .filter(|s| predicate(query, &s.search_key()))
            .collect();
        if matches.is_empty() {
            return None;
        }
        Some(Tree::hydrate(&matches))
    }

    /// Structural comparison; `true` when the trees differ
    pub fn diff(&self, other: &Tree) -> bool {
        self.diff_node(self.root, other, other.root)
    }

    fn diff_node(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        let (na, nb) = (&self.nodes[a.0], &other.nodes[b.0]);
        if na.children.len() != nb.children.len() {
            return true;
        }
        if na.id != nb.id || na.kind != nb.kind || na.extras != nb.extras {
            return true;
        }
        na.children
            .iter()
            .zip(nb.children.iter())
            .any(|(ca, cb)| self.diff_node(*ca, other, *cb))
    }

    /// Indented text rendering, one node per line
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id.0];
        let status = node.extras.get(STATUS_KEY).map(String::as_str).unwrap_or("");
        let _ = write!(
            out,
            "{}{} {} [{}]",
            "  ".repeat(depth),
            node.kind.resource(),
            node.id,
            status
        );
        if let Some(info) = node.info() {
            let _ = write!(out, " {}", info);
        }
        out.push('\n');
        for c in &node.children {
            self.dump_node(*c, depth + 1, out);
        }
    }
}

impl Index<NodeId> for Tree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}

/// Compare two possibly absent trees; `true` when they differ
pub fn diff_trees(a: Option<&Tree>, b: Option<&Tree>) -> bool {
    match (a, b) {
        (None, None) => false,
        (Some(a), Some(b)) => a.diff(b),
        _ => true,
    }
}
