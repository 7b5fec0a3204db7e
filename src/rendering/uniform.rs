use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::hmd::EyeView;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct EyeUniformState {
    pub view_proj: Mat4,
    pub eye_position: Vec4,
}

impl EyeUniformState {
    pub fn new(eye: &EyeView) -> Self {
        Self {
            view_proj: eye.projection * eye.view,
            eye_position: eye.position.extend(1.0),
        }
    }
}

/// A uniform buffer holding one `T` behind a single-binding bind group.
pub struct Uniform<T> {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    _state: PhantomData<T>,
}

impl<T: Pod> Uniform<T> {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        visibility: wgpu::ShaderStages,
        initial_state: T,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} uniform buffer")),
            contents: bytemuck::cast_slice(&[initial_state]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} uniform bind group layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} uniform bind group")),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
            _state: PhantomData,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}
