use id_arena::Id;

use crate::scene_graph::{geode::Geode, matrix_transform::MatrixTransform};

pub type NodeId = Id<Node>;

/// A scene graph node. Groups and transforms are interior nodes, geodes are leaves.
#[derive(Debug)]
pub enum Node {
    Group(Group),
    Transform(MatrixTransform),
    Geode(Geode),
}

impl Node {
    /// The child list of a composite node, `None` for leaves.
    pub fn group(&self) -> Option<&Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Transform(transform) => Some(transform.group()),
            Node::Geode(_) => None,
        }
    }

    pub fn group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Transform(transform) => Some(transform.group_mut()),
            Node::Geode(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Geode(_))
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Node::Group(group)
    }
}

impl From<MatrixTransform> for Node {
    fn from(transform: MatrixTransform) -> Self {
        Node::Transform(transform)
    }
}

impl From<Geode> for Node {
    fn from(geode: Geode) -> Self {
        Node::Geode(geode)
    }
}

/// Ordered, non-owning list of child handles. The same child may appear more
/// than once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    children: Vec<NodeId>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Removes every occurrence of `child`.
    pub fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|&id| id != child);
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
