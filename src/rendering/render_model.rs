use std::{mem::offset_of, ops::Range};

use wgpu::util::DeviceExt;

use crate::model::{Model, Vertex};

/// Where one primitive lives inside the model's packed buffers.
struct PrimitiveRange {
    indices: Range<u32>,
    base_vertex: i32,
}

/// A `Model` uploaded to the GPU. All primitives share one vertex buffer and
/// one index buffer.
pub struct RenderModel {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    primitives: Vec<PrimitiveRange>,
}

impl RenderModel {
    pub fn from_model(device: &wgpu::Device, model: &Model) -> Self {
        let mut vertices = Vec::with_capacity(model.vertex_count());
        let mut indices = Vec::new();
        let mut primitives = Vec::with_capacity(model.primitives.len());

        for primitive in &model.primitives {
            let first_index = indices.len() as u32;
            primitives.push(PrimitiveRange {
                indices: first_index..first_index + primitive.indices.len() as u32,
                base_vertex: vertices.len() as i32,
            });

            vertices.extend_from_slice(&primitive.vertices);
            indices.extend_from_slice(&primitive.indices);
        }

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} vertices", model.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} indices", model.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertices,
            indices,
            primitives,
        }
    }

    /// Draws `instances` (a range of the bound instance buffer) of every primitive.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, instances: Range<u32>) {
        if self.primitives.is_empty() {
            return;
        }

        render_pass.set_vertex_buffer(0, self.vertices.slice(..));
        render_pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);

        for primitive in &self.primitives {
            render_pass.draw_indexed(
                primitive.indices.clone(),
                primitive.base_vertex,
                instances.clone(),
            );
        }
    }
}

pub const RENDER_MODEL_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
    ],
};
