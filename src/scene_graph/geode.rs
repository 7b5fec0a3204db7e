use glam::{Mat4, Vec3};

use crate::{
    math::Segment,
    model::ModelId,
    rendering::draw_queue::{DrawCommand, DrawQueue, FrameParams},
};

/// A debug line between two local-space points. Only drawn while active.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    pub segment: Segment,
    pub color: Vec3,
    pub active: bool,
}

impl LineSegment {
    pub fn new(start: Vec3, end: Vec3, color: Vec3) -> Self {
        Self {
            segment: Segment::new(start, end),
            color,
            active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeodeKind {
    Model(ModelId),
    Line(LineSegment),
}

/// Leaf node. Holds the world transform it was last drawn with.
#[derive(Debug, Clone)]
pub struct Geode {
    to_world: Mat4,
    kind: GeodeKind,
}

impl Geode {
    pub fn new(kind: GeodeKind) -> Self {
        Self {
            to_world: Mat4::IDENTITY,
            kind,
        }
    }

    pub fn model(model: ModelId) -> Self {
        Self::new(GeodeKind::Model(model))
    }

    pub fn line(line: LineSegment) -> Self {
        Self::new(GeodeKind::Line(line))
    }

    pub fn to_world(&self) -> Mat4 {
        self.to_world
    }

    pub fn kind(&self) -> &GeodeKind {
        &self.kind
    }

    pub fn as_line(&self) -> Option<&LineSegment> {
        match &self.kind {
            GeodeKind::Line(line) => Some(line),
            GeodeKind::Model(_) => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LineSegment> {
        match &mut self.kind {
            GeodeKind::Line(line) => Some(line),
            GeodeKind::Model(_) => None,
        }
    }

    /// The line in world space, using the transform of the last draw.
    pub fn world_segment(&self) -> Option<Segment> {
        self.as_line()
            .map(|line| line.segment.transform(&self.to_world))
    }

    /// Replaces the world transform with `parent`. Leaves have no local
    /// offset; any placement comes from an enclosing `MatrixTransform`.
    pub fn draw(&mut self, parent: Mat4) {
        self.to_world = parent;
    }

    pub fn draw_with(&mut self, parent: Mat4, frame: &FrameParams, queue: &mut DrawQueue) {
        self.draw(parent);

        match &self.kind {
            GeodeKind::Model(model) => queue.push(DrawCommand::Mesh {
                model: *model,
                to_world: self.to_world,
                frame: *frame,
            }),
            GeodeKind::Line(line) if line.active => {
                let segment = line.segment.transform(&self.to_world);
                queue.push(DrawCommand::Line {
                    from: segment.start,
                    to: segment.end,
                    color: line.color,
                    frame: *frame,
                });
            }
            GeodeKind::Line(_) => {}
        }
    }

    pub fn update(&mut self) {
        match &mut self.kind {
            // Neither leaf kind animates on its own.
            GeodeKind::Model(_) | GeodeKind::Line(_) => {}
        }
    }
}
