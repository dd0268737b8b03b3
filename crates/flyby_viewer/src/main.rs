mod config;
mod controls;
mod pacing;
mod present;

use anyhow::{Context, Result};
use config::ViewerConfig;
use controls::Action;
use flyby_math::Vec2;
use flyby_renderer::{Camera, InputState, RenderSettings, Renderer, Scene};
use pacing::FramePacer;
use present::Presenter;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Fullscreen, Window, WindowId},
};

/// Application state
struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,

    renderer: Renderer,
    camera: Camera,

    // Input state
    input: InputState,
    pacer: FramePacer,
    last_frame_time: Instant,
    minimized: bool,
}

/// A window with no area has nothing to trace or present.
fn is_minimized(size: (u32, u32)) -> bool {
    size.0 == 0 || size.1 == 0
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let renderer = Renderer::new(
            Scene::demo(),
            RenderSettings::default(),
            config.width,
            config.height,
        );
        let camera = Camera::new(config.vertical_fov, config.near_clip, config.far_clip);
        let pacer = FramePacer::new(config.target_fps);

        Self {
            config,
            window: None,
            presenter: None,
            renderer,
            camera,
            input: InputState::new(),
            pacer,
            last_frame_time: Instant::now(),
            minimized: false,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(self.config.width, self.config.height));
        if self.config.fullscreen {
            window_attrs = window_attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let presenter = pollster::block_on(Presenter::new(window.clone()))
            .context("Failed to initialize presenter")?;

        let size = window.inner_size();
        self.minimized = is_minimized((size.width, size.height));
        self.renderer.on_resize(size.width, size.height);

        self.window = Some(window);
        self.presenter = Some(presenter);
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;

        if let Some(key) = controls::movement_key(code) {
            self.input.set_key(key, pressed);
            return;
        }

        if !pressed || event.repeat {
            return;
        }
        match controls::action(code) {
            Some(Action::ResetAccumulation) => {
                self.renderer.reset_frame_index();
                log::info!("Accumulation reset requested");
            }
            Some(Action::ToggleAccumulation) => {
                let accumulate = !self.renderer.accumulate();
                self.renderer.set_accumulate(accumulate);
            }
            Some(Action::Quit) => event_loop.exit(),
            None => {}
        }
    }

    fn on_window_resized(&mut self, size: (u32, u32)) {
        self.minimized = is_minimized(size);
        if self.minimized {
            log::debug!("Window minimized, pausing rendering");
            return;
        }
        if let Some(presenter) = &mut self.presenter {
            presenter.resize(size);
        }
        if self.renderer.on_resize(size.0, size.1) {
            log::info!("Resized to {}x{}", size.0, size.1);
        }
    }

    /// Advance the camera and trace one frame. Returns false while minimized.
    fn trace_frame(&mut self, delta_time: f32) -> bool {
        if self.minimized {
            return false;
        }
        self.renderer.update(&mut self.camera, &self.input, delta_time);
        true
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta_time = (now - self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.pacer.begin_frame(now);

        if !self.trace_frame(delta_time) {
            return;
        }

        let Some(presenter) = &mut self.presenter else {
            return;
        };
        if let Err(e) = presenter.present(self.renderer.image()) {
            // Check if it's a surface error we can handle
            if let Some(surface_err) = e.downcast_ref::<wgpu::SurfaceError>() {
                match surface_err {
                    wgpu::SurfaceError::Lost => {
                        // Surface lost, reconfigure
                        let size = presenter.size;
                        presenter.resize(size);
                    }
                    wgpu::SurfaceError::OutOfMemory => {
                        log::error!("Out of memory!");
                        event_loop.exit();
                    }
                    _ => {
                        log::error!("Surface error: {:?}", surface_err);
                    }
                }
            } else {
                log::error!("Present error: {:?}", e);
            }
        }

        log::trace!(
            "Frame {} took {:?}",
            self.renderer.frame_index(),
            now.elapsed()
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.init_window(event_loop) {
            Ok(()) => log::info!("Window and presenter initialized"),
            Err(e) => {
                log::error!("{:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                self.on_window_resized((physical_size.width, physical_size.height));
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
            }
            WindowEvent::MouseInput { button: MouseButton::Right, state, .. } => {
                self.input.look = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.mouse_position = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Sleep off the rest of the frame budget before drawing again
        if !self.minimized && self.pacer.remaining(Instant::now()).is_none() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.pacer.deadline()));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Starting Flyby");
    log::info!("W/S/A/D/Q/E to move, hold right mouse to look, R to reset, T to toggle accumulation");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(ViewerConfig::default());

    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    Ok(())
}
