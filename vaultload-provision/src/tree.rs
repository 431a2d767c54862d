//! Biased random tree of secret paths
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The root's
//! direct children are scopes (first-level folders); every other node is a
//! leaf whose path names a secret.

use crate::error::ProvisionError;
use crate::random;
use rand::Rng;

/// Handle of a node inside a [`PathTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed tree of secret paths
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<Node>,
}

impl PathTree {
    const ROOT: NodeId = NodeId(0);

    /// Build a tree with the given scopes under the root
    pub fn new<I, S>(root_name: impl Into<String>, scope_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tree = Self {
            nodes: vec![Node {
                name: root_name.into(),
                parent: None,
                children: Vec::new(),
            }],
        };
        for scope in scope_names {
            tree.attach(Self::ROOT, scope.into());
        }
        tree
    }

    /// Build a tree with `scope_count` randomly named scopes
    pub fn with_random_scopes<R: Rng + ?Sized>(
        root_name: impl Into<String>,
        scope_count: usize,
        rng: &mut R,
    ) -> Self {
        let scopes: Vec<String> = (0..scope_count).map(|_| random::ipv4(rng)).collect();
        Self::new(root_name, scopes)
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn scopes(&self) -> &[NodeId] {
        &self.nodes[Self::ROOT.0].children
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of nodes including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Attach a new leaf using the top-heavy walk.
    ///
    /// Start at a uniformly chosen scope. While a fair coin comes up heads and
    /// the current node has children, jump to another uniformly chosen scope.
    /// Each step re-rolls from the root's children rather than descending from
    /// the current node, so leaves always hang directly below a scope.
    pub fn add_random_leaf<R: Rng + ?Sized>(
        &mut self,
        name: impl Into<String>,
        rng: &mut R,
    ) -> Result<NodeId, ProvisionError> {
        let name = name.into();
        let scopes = self.scopes();
        if scopes.is_empty() {
            return Err(ProvisionError::NoScopes { leaf: name });
        }

        let mut current = scopes[rng.random_range(0..scopes.len())];
        while rng.random::<f32>() < 0.5 && !self.children(current).is_empty() {
            current = scopes[rng.random_range(0..scopes.len())];
        }

        Ok(self.attach(current, name))
    }

    /// Scope names in creation order
    pub fn first_level_paths(&self) -> Vec<String> {
        self.scopes()
            .iter()
            .map(|id| self.name(*id).to_string())
            .collect()
    }

    /// "/"-joined chain of names from the first level down to `id`.
    ///
    /// The root's own name is not part of the path; the root itself maps to an
    /// empty string.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == Self::ROOT {
                break;
            }
            segments.push(self.name(node));
            current = self.parent(node);
        }
        segments.reverse();
        segments.join("/")
    }

    fn attach(&mut self, parent: NodeId, name: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}
