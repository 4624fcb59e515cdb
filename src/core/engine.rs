//! Window, event loop and frame scheduling

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::core::NextTick;
use crate::input::Input;
use crate::renderer::{RenderError, Renderer};
use crate::scene::Viewport;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width in logical pixels
    pub width: u32,
    /// Initial window height in logical pixels
    pub height: u32,
    /// Enable VSync
    pub vsync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Portal"),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with a title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable VSync
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }
}

/// Errors that stop the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The event loop could not be created or failed while running
    EventLoop(String),
    /// The window could not be created
    Window(String),
    /// The renderer could not be initialized
    Renderer(RenderError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventLoop(e) => write!(f, "Event loop error: {e}"),
            Self::Window(e) => write!(f, "Window error: {e}"),
            Self::Renderer(e) => write!(f, "Renderer error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<RenderError> for EngineError {
    fn from(e: RenderError) -> Self {
        Self::Renderer(e)
    }
}

/// Application callbacks driven by the engine
pub trait Game: 'static {
    /// Called once the window and renderer exist
    fn init(&mut self, engine: &mut EngineContext);

    /// Offered every window event first; return true to consume it
    fn on_window_event(&mut self, _engine: &mut EngineContext, _event: &WindowEvent) -> bool {
        false
    }

    /// Called every frame before rendering
    fn update(&mut self, engine: &mut EngineContext);

    /// Called every frame to draw; should call [`EngineContext::schedule`]
    fn render(&mut self, engine: &mut EngineContext);

    /// Called when the viewport changes
    fn on_resize(&mut self, _engine: &mut EngineContext, _viewport: Viewport) {}

    /// Called when the game is shutting down
    fn shutdown(&mut self, _engine: &mut EngineContext) {}
}

/// Context passed to game callbacks
pub struct EngineContext {
    /// Input state
    pub input: Input,
    /// Renderer (available after initialization)
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    viewport: Viewport,
    next_tick: NextTick,
    should_quit: bool,
}

impl EngineContext {
    fn new(viewport: Viewport) -> Self {
        Self {
            input: Input::new(),
            renderer: None,
            window: None,
            viewport,
            next_tick: NextTick::Immediately,
            should_quit: false,
        }
    }

    /// Get the renderer
    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    /// Get the renderer mutably
    pub fn renderer_mut(&mut self) -> Option<&mut Renderer> {
        self.renderer.as_mut()
    }

    /// The window, once created
    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// When the next frame should be drawn
    pub fn schedule(&mut self, next: NextTick) {
        self.next_tick = next;
    }

    /// Most recent scheduling decision
    pub fn next_tick(&self) -> NextTick {
        self.next_tick
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if engine should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: EngineContext,
    initialized: bool,
    /// Deadline of a delayed redraw
    redraw_at: Option<Instant>,
    error: Option<EngineError>,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    pub fn new(config: EngineConfig, game: G) -> Self {
        let context = EngineContext::new(Viewport::new(config.width, config.height, 1.0));
        Self {
            config,
            game,
            context,
            initialized: false,
            redraw_at: None,
            error: None,
        }
    }

    /// Run until the window closes
    ///
    /// # Errors
    ///
    /// Returns an error if the event loop, window or renderer fails
    pub fn run(mut self) -> Result<(), EngineError> {
        log::info!("Starting engine: {}", self.config.title);

        let event_loop = EventLoop::new().map_err(|e| EngineError::EventLoop(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop
            .run_app(&mut self)
            .map_err(|e| EngineError::EventLoop(e.to_string()))?;

        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), EngineError> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| EngineError::Window(e.to_string()))?,
        );

        let size = window.inner_size();
        let viewport = Viewport::from_physical(
            size.width.max(1),
            size.height.max(1),
            window.scale_factor(),
        );
        let renderer = pollster::block_on(Renderer::new(
            Arc::clone(&window),
            viewport,
            self.config.vsync,
        ))?;

        self.context.viewport = viewport;
        self.context.renderer = Some(renderer);
        self.context.window = Some(window);
        Ok(())
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        if viewport.width == 0 || viewport.height == 0 || viewport == self.context.viewport {
            return;
        }
        self.context.viewport = viewport;
        if let Some(renderer) = &mut self.context.renderer {
            renderer.resize(viewport);
        }
        self.game.on_resize(&mut self.context, viewport);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.game.shutdown(&mut self.context);
        event_loop.exit();
    }
}

impl<G: Game> ApplicationHandler for Engine<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("{e}");
            self.error = Some(e);
            event_loop.exit();
            return;
        }

        if !self.initialized {
            self.game.init(&mut self.context);
            self.initialized = true;
            log::info!("Engine initialized successfully");
        }
        if let Some(window) = &self.context.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = self.game.on_window_event(&mut self.context, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.exit(event_loop);
            }

            WindowEvent::Resized(size) => {
                let scale_factor = self
                    .context
                    .window
                    .as_ref()
                    .map_or(1.0, |window| window.scale_factor());
                self.apply_viewport(Viewport::from_physical(size.width, size.height, scale_factor));
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.context.window.as_ref().map(|w| w.inner_size()) {
                    self.apply_viewport(Viewport::from_physical(
                        size.width,
                        size.height,
                        scale_factor,
                    ));
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if key_code == KeyCode::Escape && event.state == ElementState::Pressed {
                        log::info!("Escape pressed, shutting down");
                        self.exit(event_loop);
                        return;
                    }
                    if !consumed {
                        self.context.input.process_keyboard(key_code, event.state);
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                // Releases always go through so a drag never sticks
                if !consumed || state == ElementState::Released {
                    self.context.input.process_mouse_button(button, state);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let position = glam::Vec2::new(position.x as f32, position.y as f32);
                self.context.input.process_mouse_motion(position);
            }

            WindowEvent::CursorLeft { .. } => self.context.input.clear_mouse_position(),

            WindowEvent::MouseWheel { delta, .. } if !consumed => match delta {
                MouseScrollDelta::LineDelta(_, y) => self.context.input.process_scroll_lines(y),
                MouseScrollDelta::PixelDelta(pos) => {
                    self.context.input.process_scroll_pixels(pos.y as f32);
                }
            },

            WindowEvent::RedrawRequested => {
                self.game.update(&mut self.context);

                if self.context.should_quit() {
                    self.exit(event_loop);
                    return;
                }

                self.game.render(&mut self.context);
                self.context.input.update();

                match self.context.next_tick {
                    NextTick::Immediately => {
                        self.redraw_at = None;
                        if let Some(window) = &self.context.window {
                            window.request_redraw();
                        }
                    }
                    NextTick::After(delay) => self.redraw_at = Some(Instant::now() + delay),
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(at) = self.redraw_at else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };
        if Instant::now() >= at {
            self.redraw_at = None;
            event_loop.set_control_flow(ControlFlow::Wait);
            if let Some(window) = &self.context.window {
                window.request_redraw();
            }
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(at));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::default()
            .with_title("Room")
            .with_size(800, 600)
            .with_vsync(false);
        assert_eq!(config.title, "Room");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(!config.vsync);
    }

    #[test]
    fn test_context_schedule() {
        let mut context = EngineContext::new(Viewport::new(640, 480, 1.0));
        assert_eq!(context.next_tick(), NextTick::Immediately);
        assert!(context.renderer().is_none());

        context.schedule(NextTick::After(Duration::from_millis(16)));
        assert_eq!(context.next_tick(), NextTick::After(Duration::from_millis(16)));
    }

    #[test]
    fn test_renderer_error_wraps() {
        let error = EngineError::from(RenderError::NoAdapter);
        assert_eq!(error.to_string(), "Renderer error: No suitable GPU adapter found");
    }
}
