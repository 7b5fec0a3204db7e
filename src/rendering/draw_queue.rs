use glam::{Mat4, Vec3};

use crate::{
    model::ModelId,
    rendering::{instance::Instance, line_buffer::LineVertex, shader_loader::PipelineId},
};

/// Per-pass rendering parameters, threaded unchanged from the root of a
/// traversal down to every leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub shader: PipelineId,
    pub projection: Mat4,
    pub view: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Mesh {
        model: ModelId,
        to_world: Mat4,
        frame: FrameParams,
    },
    /// Endpoints are already in world space.
    Line {
        from: Vec3,
        to: Vec3,
        color: Vec3,
        frame: FrameParams,
    },
}

impl DrawCommand {
    pub fn frame(&self) -> &FrameParams {
        match self {
            DrawCommand::Mesh { frame, .. } | DrawCommand::Line { frame, .. } => frame,
        }
    }
}

pub struct MeshBatch {
    pub shader: PipelineId,
    pub model: ModelId,
    pub instances: Vec<Instance>,
}

pub struct LineBatch {
    pub shader: PipelineId,
    pub vertices: Vec<LineVertex>,
}

/// Draw commands emitted by scene graph leaves, in emission order.
#[derive(Default)]
pub struct DrawQueue {
    commands: Vec<DrawCommand>,
}

impl DrawQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Groups mesh commands by (shader, model), in order of first appearance.
    pub fn mesh_batches(&self) -> Vec<MeshBatch> {
        let mut batches: Vec<MeshBatch> = Vec::new();

        for command in &self.commands {
            let DrawCommand::Mesh {
                model,
                to_world,
                frame,
            } = command
            else {
                continue;
            };

            let instance = Instance { model: *to_world };

            match batches
                .iter_mut()
                .find(|batch| batch.shader == frame.shader && batch.model == *model)
            {
                Some(batch) => batch.instances.push(instance),
                None => batches.push(MeshBatch {
                    shader: frame.shader,
                    model: *model,
                    instances: vec![instance],
                }),
            }
        }

        batches
    }

    /// Groups line commands by shader, in order of first appearance.
    pub fn line_batches(&self) -> Vec<LineBatch> {
        let mut batches: Vec<LineBatch> = Vec::new();

        for command in &self.commands {
            let DrawCommand::Line {
                from,
                to,
                color,
                frame,
            } = command
            else {
                continue;
            };

            let vertices = [LineVertex::new(*from, *color), LineVertex::new(*to, *color)];

            match batches
                .iter_mut()
                .find(|batch| batch.shader == frame.shader)
            {
                Some(batch) => batch.vertices.extend_from_slice(&vertices),
                None => batches.push(LineBatch {
                    shader: frame.shader,
                    vertices: vertices.to_vec(),
                }),
            }
        }

        batches
    }
}

#[cfg(test)]
mod tests {
    use id_arena::Arena;

    use super::*;
    use crate::{model::Model, rendering::shader_loader::PipelineCacheEntry};

    fn frame(shader: PipelineId) -> FrameParams {
        FrameParams {
            shader,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }

    #[test]
    fn mesh_batches_keep_first_appearance_order() {
        let mut pipelines = Arena::<PipelineCacheEntry>::new();
        let shader = pipelines.alloc(PipelineCacheEntry::default());
        let mut models = Arena::<Model>::new();
        let cube = models.alloc(Model::cube("Cube", 1.0));
        let other = models.alloc(Model::cube("Other", 2.0));

        let mut queue = DrawQueue::new();
        for (model, x) in [(other, 1.0), (cube, 2.0), (other, 3.0)] {
            queue.push(DrawCommand::Mesh {
                model,
                to_world: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
                frame: frame(shader),
            });
        }

        let batches = queue.mesh_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].model, other);
        assert_eq!(batches[0].instances.len(), 2);
        assert_eq!(batches[0].instances[1].model.w_axis.x, 3.0);
        assert_eq!(batches[1].model, cube);
    }

    #[test]
    fn same_model_with_different_shaders_is_two_batches() {
        let mut pipelines = Arena::<PipelineCacheEntry>::new();
        let first = pipelines.alloc(PipelineCacheEntry::default());
        let second = pipelines.alloc(PipelineCacheEntry::default());
        let mut models = Arena::<Model>::new();
        let cube = models.alloc(Model::cube("Cube", 1.0));

        let mut queue = DrawQueue::new();
        for shader in [first, second] {
            queue.push(DrawCommand::Mesh {
                model: cube,
                to_world: Mat4::IDENTITY,
                frame: frame(shader),
            });
        }

        assert_eq!(queue.mesh_batches().len(), 2);
    }

    #[test]
    fn line_batches_emit_two_vertices_per_line() {
        let mut pipelines = Arena::<PipelineCacheEntry>::new();
        let shader = pipelines.alloc(PipelineCacheEntry::default());

        let mut queue = DrawQueue::new();
        queue.push(DrawCommand::Line {
            from: Vec3::ZERO,
            to: Vec3::X,
            color: Vec3::Y,
            frame: frame(shader),
        });
        queue.push(DrawCommand::Line {
            from: Vec3::Z,
            to: Vec3::ONE,
            color: Vec3::Y,
            frame: frame(shader),
        });

        let batches = queue.line_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].vertices.len(), 4);
        assert_eq!(batches[0].vertices[3].position, Vec3::ONE);
        assert!(queue.mesh_batches().is_empty());
    }
}
