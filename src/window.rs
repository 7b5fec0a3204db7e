use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    config::DemoConfig,
    demo::DemoState,
    engine,
    hmd::{DesktopHmd, Hand, HeadMountedDisplay},
    rendering::renderer::Renderer,
};

struct App {
    config: DemoConfig,
    renderer: Option<Renderer>,
    demo_state: DemoState,
    hmd: DesktopHmd,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: DemoConfig, demo_state: DemoState) -> Self {
        Self {
            hmd: DesktopHmd::new(config.hmd.clone()),
            config,
            renderer: None,
            demo_state,
            last_frame: Instant::now(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        self.hmd.end_session();
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes =
            Window::default_attributes().with_title(self.config.window_title.as_str());
        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;

        let mut renderer = pollster::block_on(Renderer::new(Arc::new(window), &self.config))
            .context("Failed to create renderer")?;
        renderer.load_models(&self.demo_state);
        self.renderer = Some(renderer);
        self.last_frame = Instant::now();

        self.hmd.begin_session()
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let elapsed = now - self.last_frame;
        self.last_frame = now;

        if let Err(e) = engine::update(&mut self.demo_state, &mut self.hmd, elapsed) {
            self.fail(event_loop, e);
            return;
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match renderer.render(&mut self.demo_state, &self.hmd) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                self.hmd.end_session();
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;

        match code {
            KeyCode::Space => {
                for hand in Hand::BOTH {
                    self.hmd.set_trigger(hand, pressed);
                }
            }
            KeyCode::Enter => self.hmd.set_button(pressed),
            KeyCode::KeyR if pressed && !event.repeat => {
                self.hmd.recenter();
                log::info!("Recentered, score so far: {}", self.demo_state.score());
            }
            KeyCode::Escape if pressed => {
                self.hmd.end_session();
                event_loop.exit();
            }
            _ => (),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.hmd.end_session();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(new_size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(renderer) = self.renderer.as_ref() {
                    let size = renderer.size;
                    if size.width > 0 && size.height > 0 {
                        let cursor = Vec2::new(
                            position.x as f32 / size.width as f32 * 2.0 - 1.0,
                            1.0 - position.y as f32 / size.height as f32 * 2.0,
                        );
                        self.hmd.aim_at(cursor);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let hand = match button {
                    MouseButton::Left => Hand::Left,
                    MouseButton::Right => Hand::Right,
                    _ => return,
                };
                self.hmd.set_trigger(hand, state == ElementState::Pressed);
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, event),
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window.request_redraw();
        }
    }
}

pub async fn run(config: DemoConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let demo_state = DemoState::new(&config).context("Failed to create demo state")?;
    let mut app = App::new(config, demo_state);
    event_loop.run_app(&mut app)?;

    log::info!("Final score: {}", app.demo_state.score());

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
