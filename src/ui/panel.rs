//! egui debug overlay
//!
//! Draws the tweak panel and the frame statistics box, and hands the
//! tessellated output to the renderer.

use std::path::{Path, PathBuf};

use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use super::{
    Preset, TweakError, TweakKind, TweakPanel, parse_hex_color, to_hex_color, to_srgb_bytes,
};
use crate::core::FrameStats;
use crate::scene::PortalScene;

/// Tessellated overlay ready for the egui renderer
pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Debug panel and stats overlay
pub struct DebugOverlay {
    ctx: egui::Context,
    state: egui_winit::State,
    panel: TweakPanel,
    /// Where the panel's preset buttons save and load
    preset_path: PathBuf,
    visible: bool,
}

impl DebugOverlay {
    /// Create the overlay for `window`
    pub fn new(window: &Window, panel: TweakPanel, preset_path: impl Into<PathBuf>) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self {
            ctx,
            state,
            panel,
            preset_path: preset_path.into(),
            visible: true,
        }
    }

    pub fn panel(&self) -> &TweakPanel {
        &self.panel
    }

    /// Show or hide the tweak panel; stats stay visible
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Feed a window event to egui; returns true if egui consumed it
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Whether the pointer is over an egui widget
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Build this frame's overlay, applying any panel edits to `scene`
    pub fn run(
        &mut self,
        window: &Window,
        scene: &mut PortalScene,
        stats: &FrameStats,
    ) -> OverlayFrame {
        let raw_input = self.state.take_egui_input(window);
        let panel = &self.panel;
        let preset_path = &self.preset_path;
        let visible = self.visible;

        let full_output = self.ctx.run(raw_input, |ctx| {
            draw_stats(ctx, stats);
            if visible {
                draw_panel(ctx, panel, scene, preset_path);
            }
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        OverlayFrame {
            primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        }
    }
}

fn draw_stats(ctx: &egui::Context, stats: &FrameStats) {
    egui::Window::new("Stats")
        .title_bar(false)
        .resizable(false)
        .fixed_pos(egui::pos2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("{:.0} FPS", stats.fps()))
                    .size(18.0)
                    .color(egui::Color32::from_rgb(0, 255, 255)),
            );
            ui.label(
                egui::RichText::new(format!(
                    "{:.2} ms ({:.2}-{:.2})",
                    stats.avg_frame_time_ms(),
                    stats.min_frame_time_ms(),
                    stats.max_frame_time_ms()
                ))
                .color(egui::Color32::GRAY),
            );
        });
}

fn draw_panel(
    ctx: &egui::Context,
    panel: &TweakPanel,
    scene: &mut PortalScene,
    preset_path: &Path,
) {
    egui::Window::new(panel.title.as_str())
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .resizable(false)
        .default_width(280.0)
        .show(ctx, |ui| {
            for folder in panel.folders() {
                egui::CollapsingHeader::new(folder)
                    .default_open(true)
                    .show(ui, |ui| {
                        for (index, tweak) in panel.tweaks().iter().enumerate() {
                            if tweak.folder == folder {
                                draw_tweak(ui, panel, index, scene);
                            }
                        }
                    });
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save preset").clicked() {
                    match panel.export_preset(scene).save(preset_path) {
                        Ok(()) => log::info!("Saved preset to {}", preset_path.display()),
                        Err(e) => log::error!("Failed to save preset: {e}"),
                    }
                }
                if ui.button("Load preset").clicked() {
                    match Preset::load(preset_path) {
                        Ok(preset) => {
                            let applied = panel.import_preset(&preset, scene);
                            log::info!("Applied {applied} values from {}", preset_path.display());
                        }
                        Err(e) => log::error!("Failed to load preset: {e}"),
                    }
                }
            });
        });
}

fn draw_tweak(ui: &mut egui::Ui, panel: &TweakPanel, index: usize, scene: &mut PortalScene) {
    let tweak = &panel.tweaks()[index];
    match &tweak.kind {
        TweakKind::Scalar { min, max, step, get, .. } => {
            let mut value = get(scene);
            let slider = egui::Slider::new(&mut value, *min..=*max)
                .step_by(f64::from(*step))
                .text(tweak.label.as_str());
            if ui.add(slider).changed() {
                commit(panel.set_scalar(index, value, scene).map(|_| ()));
            }
        }
        TweakKind::Color { get, .. } => {
            let current = parse_hex_color(&get(scene)).unwrap_or(Vec3::ZERO);
            let mut rgb = to_srgb_bytes(current);
            ui.horizontal(|ui| {
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    let hex = to_hex_color(Vec3::from(rgb.map(|c| f32::from(c) / 255.0)));
                    commit(panel.set_color(index, &hex, scene));
                }
                ui.label(tweak.label.as_str());
            });
        }
    }
}

/// Log a rejected panel edit; returns whether it was applied
fn commit(result: Result<(), TweakError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Panel edit rejected: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PortalConfig, SceneVariant};
    use crate::scene::Viewport;

    fn scene() -> PortalScene {
        let config = PortalConfig {
            variant: SceneVariant::Basic,
            ..PortalConfig::default()
        };
        PortalScene::new(&config, Viewport::new(800, 600, 1.0))
    }

    #[test]
    fn test_commit_applies_valid_edit() {
        let mut scene = scene();
        let panel = TweakPanel::for_scene(&scene);
        let speed = panel.find("uWaveSpeed").unwrap();

        assert!(commit(panel.set_scalar(speed, 0.5, &mut scene).map(|_| ())));
        assert_eq!(scene.portal.uniforms.wave_speed, 0.5);
    }

    #[test]
    fn test_commit_reports_rejected_edit() {
        let mut scene = scene();
        let panel = TweakPanel::for_scene(&scene);
        let base = panel.find("baseColor").unwrap();
        let before = scene.portal.uniforms;

        assert!(!commit(panel.set_scalar(base, 0.5, &mut scene).map(|_| ())));
        assert!(!commit(panel.set_color(base, "#12345", &mut scene)));
        assert_eq!(scene.portal.uniforms, before);
    }

    #[test]
    fn test_idle_frame_leaves_scene_untouched() {
        let mut scene = scene();
        let panel = TweakPanel::for_scene(&scene);
        let before = scene.portal.uniforms;
        let ctx = egui::Context::default();

        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            draw_panel(ctx, &panel, &mut scene, Path::new("unused-preset.ron"));
        });

        assert_eq!(scene.portal.uniforms, before);
    }
}
