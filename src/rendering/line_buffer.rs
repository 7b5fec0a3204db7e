use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::BufferUsages;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: Vec3,
    pub color: Vec3,
}

impl LineVertex {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

pub const LINE_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(LineVertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(LineVertex, color) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
    ],
};

/// World-space line vertices for one eye pass.
pub struct LineBuffer(wgpu::Buffer);

impl LineBuffer {
    pub const MAX_VERTICES: usize = 256;

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line vertex buffer"),
            size: (size_of::<LineVertex>() * Self::MAX_VERTICES) as wgpu::BufferAddress,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self(buffer)
    }

    /// Writes `vertices` starting at vertex index `first`. Returns how many fit,
    /// rounded down to whole lines.
    pub fn write(&self, queue: &wgpu::Queue, first: usize, vertices: &[LineVertex]) -> usize {
        let count = vertices.len().min(Self::MAX_VERTICES.saturating_sub(first)) & !1;

        if count > 0 {
            queue.write_buffer(
                &self.0,
                (first * size_of::<LineVertex>()) as wgpu::BufferAddress,
                bytemuck::cast_slice(&vertices[..count]),
            );
        }

        count
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.0.slice(..));
    }
}
