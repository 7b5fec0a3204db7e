use std::{collections::HashMap, ops::Range, sync::Arc};

use anyhow::Context;
use glam::{Mat4, Vec4};
use wgpu::{
    CommandEncoderDescriptor, DepthBiasState, Device, MultisampleState, PipelineCompilationOptions,
    RenderPassDescriptor, ShaderSource, StencilState,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    config::DemoConfig,
    demo::{DemoState, FrameContext},
    hmd::HeadMountedDisplay,
    lighting::LightsUniformState,
    model::ModelId,
    rendering::{
        draw_queue::DrawQueue,
        instance::{Instance, InstanceBuffer},
        line_buffer::{LineBuffer, LINE_VBL},
        render_model::{RenderModel, RENDER_MODEL_VBL},
        shader_loader::{
            PipelineCache, PipelineCacheBuilder, PipelineFactory, PipelineId, ShaderDefinition,
        },
        texture::DepthTexture,
        uniform::{EyeUniformState, Uniform},
    },
};

const MESH_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Mesh Shader",
    path: "mesh.wgsl",
};

const LINE_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Line Shader",
    path: "line.wgsl",
};

/// Shader handles the scene driver threads through the scene graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneShaders {
    pub mesh: PipelineId,
    pub line: PipelineId,
}

struct MeshDraw {
    shader: PipelineId,
    model: ModelId,
    instances: Range<u32>,
}

struct LineDraw {
    shader: PipelineId,
    vertices: Range<u32>,
}

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,

    pipeline_cache: PipelineCache,
    shaders: SceneShaders,

    eye_uniform: Uniform<EyeUniformState>,
    lights: Uniform<LightsUniformState>,

    render_models: HashMap<ModelId, RenderModel>,
    instance_buffer: InstanceBuffer,
    line_buffer: LineBuffer,
    draw_queue: DrawQueue,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, config: &DemoConfig) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("Surface reports no supported formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_texture = DepthTexture::new(&device, &surface_config);

        let eye_uniform = Uniform::new(
            &device,
            "Eye",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
            EyeUniformState {
                view_proj: Mat4::IDENTITY,
                eye_position: Vec4::W,
            },
        );
        let lights = Uniform::new(
            &device,
            "Lights",
            wgpu::ShaderStages::FRAGMENT,
            LightsUniformState::new(&config.lights),
        );

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&eye_uniform.bind_group_layout, &lights.bind_group_layout],
            push_constant_ranges: &[],
        });
        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&eye_uniform.bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut cache_builder = PipelineCacheBuilder::new();
        let shaders = SceneShaders {
            mesh: cache_builder.add_shader(MESH_SHADER, mesh_pipeline(surface_format, mesh_layout)),
            line: cache_builder.add_shader(LINE_SHADER, line_pipeline(surface_format, line_layout)),
        };
        let pipeline_cache = cache_builder.build(&device)?;

        let instance_buffer = InstanceBuffer::new(&device);
        let line_buffer = LineBuffer::new(&device);

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            surface_config,
            depth_texture,
            pipeline_cache,
            shaders,
            eye_uniform,
            lights,
            render_models: HashMap::new(),
            instance_buffer,
            line_buffer,
            draw_queue: DrawQueue::new(),
        })
    }

    pub fn load_models(&mut self, demo_state: &DemoState) {
        for (id, model) in demo_state.models.iter() {
            let render_model = RenderModel::from_model(&self.device, model);
            self.render_models.insert(id, render_model);
            log::info!(
                "Loaded model {} with {} primitives",
                model.name,
                model.primitives.len()
            );
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
            self.depth_texture = DepthTexture::new(&self.device, &self.surface_config);
        }
    }

    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    /// Renders both eyes side by side. Each eye is drawn from the scene and
    /// submitted separately so the shared instance and line buffers can be
    /// rewritten between eyes.
    pub fn render(
        &mut self,
        demo_state: &mut DemoState,
        hmd: &dyn HeadMountedDisplay,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.lights
            .update(&self.queue, LightsUniformState::new(&demo_state.lights));

        let eyes = hmd.eye_views(self.surface_config.width, self.surface_config.height);
        let clear_color = demo_state.clear_color();

        for (index, eye) in eyes.iter().enumerate() {
            self.draw_queue.clear();
            demo_state.draw(
                &FrameContext {
                    shaders: self.shaders,
                    eye,
                },
                &mut self.draw_queue,
            );

            self.eye_uniform
                .update(&self.queue, EyeUniformState::new(eye));
            let mesh_draws = self.upload_meshes();
            let line_draws = self.upload_lines();

            let mut encoder = self
                .device
                .create_command_encoder(&CommandEncoderDescriptor {
                    label: Some("Eye Encoder"),
                });

            {
                let load = if index == 0 {
                    wgpu::LoadOp::Clear(clear_color)
                } else {
                    wgpu::LoadOp::Load
                };

                let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("Eye Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: self.depth_texture.view(),
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

                render_pass.set_viewport(
                    eye.viewport.x,
                    eye.viewport.y,
                    eye.viewport.width,
                    eye.viewport.height,
                    0.0,
                    1.0,
                );

                self.encode_meshes(&mut render_pass, &mesh_draws);
                self.encode_lines(&mut render_pass, &line_draws);
            }

            self.queue.submit([encoder.finish()]);
        }

        output.present();

        Ok(())
    }

    fn upload_meshes(&self) -> Vec<MeshDraw> {
        let mut draws = Vec::new();
        let mut first = 0;

        for batch in self.draw_queue.mesh_batches() {
            let written = self
                .instance_buffer
                .write(&self.queue, first, &batch.instances);

            if written < batch.instances.len() {
                log::warn!(
                    "Instance buffer full, dropped {} instances",
                    batch.instances.len() - written
                );
            }

            if written > 0 {
                draws.push(MeshDraw {
                    shader: batch.shader,
                    model: batch.model,
                    instances: first as u32..(first + written) as u32,
                });
            }

            first += written;
        }

        draws
    }

    fn upload_lines(&self) -> Vec<LineDraw> {
        let mut draws = Vec::new();
        let mut first = 0;

        for batch in self.draw_queue.line_batches() {
            let written = self.line_buffer.write(&self.queue, first, &batch.vertices);

            if written < batch.vertices.len() {
                log::warn!(
                    "Line buffer full, dropped {} vertices",
                    batch.vertices.len() - written
                );
            }

            if written > 0 {
                draws.push(LineDraw {
                    shader: batch.shader,
                    vertices: first as u32..(first + written) as u32,
                });
            }

            first += written;
        }

        draws
    }

    fn encode_meshes(&self, render_pass: &mut wgpu::RenderPass<'_>, draws: &[MeshDraw]) {
        if draws.is_empty() {
            return;
        }

        render_pass.set_bind_group(0, &self.eye_uniform.bind_group, &[]);
        render_pass.set_bind_group(1, &self.lights.bind_group, &[]);
        self.instance_buffer.bind(render_pass);

        for draw in draws {
            let (Some(pipeline), Some(render_model)) = (
                self.pipeline_cache.get(draw.shader),
                self.render_models.get(&draw.model),
            ) else {
                log::warn!("Skipping mesh draw with an unknown shader or model");
                continue;
            };

            render_pass.set_pipeline(pipeline);
            render_model.draw(render_pass, draw.instances.clone());
        }
    }

    fn encode_lines(&self, render_pass: &mut wgpu::RenderPass<'_>, draws: &[LineDraw]) {
        if draws.is_empty() {
            return;
        }

        render_pass.set_bind_group(0, &self.eye_uniform.bind_group, &[]);
        self.line_buffer.bind(render_pass);

        for draw in draws {
            let Some(pipeline) = self.pipeline_cache.get(draw.shader) else {
                log::warn!("Skipping line draw with an unknown shader");
                continue;
            };

            render_pass.set_pipeline(pipeline);
            render_pass.draw(draw.vertices.clone(), 0..1);
        }
    }
}

fn mesh_pipeline(format: wgpu::TextureFormat, layout: wgpu::PipelineLayout) -> PipelineFactory {
    Box::new(
        move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(shader_def.name),
                source: ShaderSource::Wgsl(source.into()),
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Mesh render pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[RENDER_MODEL_VBL, Instance::descriptor()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(depth_state()),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            Ok(pipeline)
        },
    )
}

fn line_pipeline(format: wgpu::TextureFormat, layout: wgpu::PipelineLayout) -> PipelineFactory {
    Box::new(
        move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(shader_def.name),
                source: ShaderSource::Wgsl(source.into()),
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Line render pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[LINE_VBL],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::LineList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(depth_state()),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            Ok(pipeline)
        },
    )
}

fn depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DepthTexture::DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: StencilState::default(),
        bias: DepthBiasState::default(),
    }
}
