//! The portal application
//!
//! Wires the scene, the asset loads, the debug overlay and the render loop
//! into the engine's callbacks.

use std::path::PathBuf;

use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

use crate::assets::{
    AssetLoader, DecodedImage, FLOOR_TEXTURE_PATH, Pending, ROOM_MODEL_PATH, RoomModel,
};
use crate::core::{EngineContext, FrameClock, Game, PortalConfig, RenderLoop};
use crate::renderer::TextureKey;
use crate::scene::{PortalScene, Viewport};
use crate::ui::{DebugOverlay, TweakPanel};

/// File the panel's preset buttons use
pub const PRESET_FILE: &str = "portal-preset.ron";

/// Application state owned by the engine
pub struct PortalApp {
    config: PortalConfig,
    loader: AssetLoader,
    scene: PortalScene,
    render_loop: RenderLoop,
    overlay: Option<DebugOverlay>,
    pending_model: Option<Pending<RoomModel>>,
    pending_texture: Option<Pending<DecodedImage>>,
    preset_path: PathBuf,
}

impl PortalApp {
    /// Build the scene for `config`; loads start once the window exists
    pub fn new(config: PortalConfig) -> Self {
        let viewport = Viewport::new(config.width, config.height, 1.0);
        let scene = PortalScene::new(&config, viewport);
        let loader = AssetLoader::new(config.asset_root.clone());
        let render_loop = RenderLoop::new(FrameClock::start(), config.frame_policy);

        Self {
            config,
            loader,
            scene,
            render_loop,
            overlay: None,
            pending_model: None,
            pending_texture: None,
            preset_path: PathBuf::from(PRESET_FILE),
        }
    }

    /// Where the panel saves and loads presets
    #[must_use]
    pub fn with_preset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preset_path = path.into();
        self
    }

    pub fn scene(&self) -> &PortalScene {
        &self.scene
    }

    /// Take finished loads and fold them into the scene
    fn poll_assets(&mut self, ctx: &mut EngineContext) {
        if let Some(result) = self.pending_model.as_mut().and_then(Pending::try_take) {
            self.pending_model = None;
            match result.and_then(|model| self.scene.insert_room(model)) {
                Ok(_) => log::info!("Room model ready"),
                Err(e) => log::error!("Room left out: {e}"),
            }
        }

        if let Some(result) = self.pending_texture.as_mut().and_then(Pending::try_take) {
            self.pending_texture = None;
            match (result, ctx.renderer_mut()) {
                (Ok(image), Some(renderer)) => renderer.insert_texture(TextureKey::MARBLE, &image),
                (Ok(_), None) => log::warn!("Floor texture loaded without a renderer"),
                (Err(e), _) => log::error!("Floor texture left out: {e}"),
            }
        }
    }

    fn apply_orbit_input(&mut self, ctx: &EngineContext) {
        if self.overlay.as_ref().is_some_and(DebugOverlay::wants_pointer) {
            return;
        }
        let height = ctx
            .window()
            .map_or(self.config.height, |window| window.inner_size().height);
        let drag = ctx.input.drag_delta();
        if drag != glam::Vec2::ZERO {
            self.scene.controls.handle_drag(drag, height as f32);
        }
        let lines = ctx.input.scroll_lines();
        if lines != 0.0 {
            self.scene.controls.handle_scroll(lines);
        }
    }
}

impl Game for PortalApp {
    fn init(&mut self, ctx: &mut EngineContext) {
        self.scene.resize(ctx.viewport());

        if let Some(window) = ctx.window() {
            let panel = TweakPanel::for_scene(&self.scene);
            log::info!("Debug panel with {} tweaks", panel.len());
            self.overlay = Some(DebugOverlay::new(window, panel, self.preset_path.clone()));
        }

        if self.config.variant.has_room() {
            self.pending_model = Some(self.loader.load_model(ROOM_MODEL_PATH));
            self.pending_texture = Some(self.loader.load_texture(FLOOR_TEXTURE_PATH));
        }

        self.render_loop.start();
    }

    fn on_window_event(&mut self, ctx: &mut EngineContext, event: &WindowEvent) -> bool {
        match (self.overlay.as_mut(), ctx.window()) {
            (Some(overlay), Some(window)) => overlay.on_window_event(window, event),
            _ => false,
        }
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        self.poll_assets(ctx);

        if ctx.input.is_key_just_pressed(KeyCode::KeyH) {
            if let Some(overlay) = &mut self.overlay {
                overlay.toggle();
            }
        }
        self.apply_orbit_input(ctx);
    }

    fn render(&mut self, ctx: &mut EngineContext) {
        let window = ctx.window().cloned();
        let Some(renderer) = ctx.renderer_mut() else {
            return;
        };

        if let (Some(overlay), Some(window)) = (&mut self.overlay, &window) {
            let frame = overlay.run(window, &mut self.scene, self.render_loop.stats());
            renderer.set_overlay(frame);
        }

        renderer.sync(&mut self.scene);
        let next = self.render_loop.tick(&mut self.scene, renderer);
        ctx.schedule(next);
    }

    fn on_resize(&mut self, _ctx: &mut EngineContext, viewport: Viewport) {
        self.scene.resize(viewport);
    }

    fn shutdown(&mut self, _ctx: &mut EngineContext) {
        let stats = self.render_loop.stats();
        log::info!("Shutting down after {} frames", stats.total_frames());
        log::debug!("{}", stats.format_stats());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneVariant;

    #[test]
    fn test_basic_variant_starts_without_room() {
        let app = PortalApp::new(PortalConfig {
            variant: SceneVariant::Basic,
            ..PortalConfig::default()
        });
        assert!(app.scene().room().is_none());
        assert!(app.scene().bloom.is_none());
        assert!(app.pending_model.is_none());
    }

    #[test]
    fn test_preset_path_override() {
        let app = PortalApp::new(PortalConfig::default()).with_preset_path("custom.json");
        assert_eq!(app.preset_path, PathBuf::from("custom.json"));
    }
}
