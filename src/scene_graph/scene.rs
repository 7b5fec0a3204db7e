use anyhow::{bail, Context};
use glam::Mat4;
use id_arena::Arena;

use crate::{
    rendering::draw_queue::{DrawQueue, FrameParams},
    scene_graph::{
        geode::Geode,
        matrix_transform::MatrixTransform,
        node::{Group, Node, NodeId},
    },
};

/// Owns every node of a scene forest. Groups refer to their children by
/// handle, so detaching a subtree never destroys it.
///
/// Traversal is a depth-first walk on the call stack and does not detect
/// cycles; callers must keep the graph acyclic.
pub struct Scene {
    nodes: Arena<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
        }
    }

    pub fn add_node(&mut self, node: impl Into<Node>) -> NodeId {
        self.nodes.alloc(node.into())
    }

    pub fn add_group(&mut self) -> NodeId {
        self.add_node(Group::new())
    }

    pub fn add_transform(&mut self, transform: MatrixTransform) -> NodeId {
        self.add_node(transform)
    }

    pub fn add_geode(&mut self, geode: Geode) -> NodeId {
        self.add_node(geode)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn transform(&self, id: NodeId) -> Option<&MatrixTransform> {
        match self.nodes.get(id) {
            Some(Node::Transform(transform)) => Some(transform),
            _ => None,
        }
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut MatrixTransform> {
        match self.nodes.get_mut(id) {
            Some(Node::Transform(transform)) => Some(transform),
            _ => None,
        }
    }

    pub fn geode(&self, id: NodeId) -> Option<&Geode> {
        match self.nodes.get(id) {
            Some(Node::Geode(geode)) => Some(geode),
            _ => None,
        }
    }

    pub fn geode_mut(&mut self, id: NodeId) -> Option<&mut Geode> {
        match self.nodes.get_mut(id) {
            Some(Node::Geode(geode)) => Some(geode),
            _ => None,
        }
    }

    /// Children of a composite node. Empty for leaves.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .and_then(Node::group)
            .map(Group::children)
            .unwrap_or(&[])
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> anyhow::Result<()> {
        if self.nodes.get(child).is_none() {
            bail!("Unknown child node {child:?}");
        }

        let node = self
            .nodes
            .get_mut(parent)
            .with_context(|| format!("Unknown parent node {parent:?}"))?;

        match node.group_mut() {
            Some(group) => {
                group.add_child(child);
                Ok(())
            }
            None => bail!("Cannot add a child to leaf node {parent:?}"),
        }
    }

    /// Detaches every occurrence of `child` from `parent`. The child stays in the scene.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(group) = self.nodes.get_mut(parent).and_then(Node::group_mut) {
            group.remove_child(child);
        }
    }

    /// Resolves world transforms below `id` without emitting draw commands.
    pub fn draw(&mut self, id: NodeId, parent: Mat4) {
        self.visit_leaves(id, parent, &mut |geode: &mut Geode, world: Mat4| {
            geode.draw(world)
        });
    }

    /// Resolves world transforms below `id` and lets every leaf emit its draw
    /// commands with `frame`.
    pub fn draw_with(
        &mut self,
        id: NodeId,
        parent: Mat4,
        frame: &FrameParams,
        queue: &mut DrawQueue,
    ) {
        self.visit_leaves(id, parent, &mut |geode: &mut Geode, world: Mat4| {
            geode.draw_with(world, frame, queue)
        });
    }

    /// Ticks `id`. Groups update every child in order; a transform only runs
    /// its own kinematics and leaves its children alone.
    pub fn update(&mut self, id: NodeId) {
        match self.nodes.get_mut(id) {
            Some(Node::Group(_)) => {}
            Some(Node::Transform(transform)) => {
                transform.update();
                return;
            }
            Some(Node::Geode(geode)) => {
                geode.update();
                return;
            }
            None => return,
        }

        let mut index = 0;
        while let Some(child) = self.child_at(id, index) {
            self.update(child);
            index += 1;
        }
    }

    fn visit_leaves<F>(&mut self, id: NodeId, parent: Mat4, visit: &mut F)
    where
        F: FnMut(&mut Geode, Mat4),
    {
        let world = match self.nodes.get_mut(id) {
            Some(Node::Group(_)) => parent,
            Some(Node::Transform(transform)) => parent * transform.matrix(),
            Some(Node::Geode(geode)) => {
                visit(geode, parent);
                return;
            }
            None => return,
        };

        let mut index = 0;
        while let Some(child) = self.child_at(id, index) {
            self.visit_leaves(child, world, visit);
            index += 1;
        }
    }

    fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes.get(id)?.group()?.child(index)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
