use glam::Mat4;
use wgpu::BufferUsages;

/// Per-instance data for mesh draws: the leaf's world transform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Instance {
    pub model: Mat4,
}

impl Instance {
    pub fn descriptor() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Instance data for every mesh batch of one eye pass, packed back to back.
pub struct InstanceBuffer(wgpu::Buffer);

impl InstanceBuffer {
    pub const MAX_INSTANCES: usize = 1024;

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance buffer"),
            size: (size_of::<Instance>() * Self::MAX_INSTANCES) as wgpu::BufferAddress,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self(buffer)
    }

    /// Writes `instances` starting at instance index `first`. Returns how many fit.
    pub fn write(&self, queue: &wgpu::Queue, first: usize, instances: &[Instance]) -> usize {
        let count = instances
            .len()
            .min(Self::MAX_INSTANCES.saturating_sub(first));

        if count > 0 {
            queue.write_buffer(
                &self.0,
                (first * size_of::<Instance>()) as wgpu::BufferAddress,
                bytemuck::cast_slice(&instances[..count]),
            );
        }

        count
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.0.slice(..));
    }
}
