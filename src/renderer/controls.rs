//! Orbit camera controls with damping
//!
//! Drag input accumulates a spherical delta around the target; `update`
//! applies a fraction of it each frame and decays the rest, which gives the
//! camera inertia after the pointer is released.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use super::Camera;

/// Keep the camera off the poles
const POLE_EPSILON: f32 = 1e-6;

/// Orbit controls around a target point
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    /// Point to orbit around
    pub target: Vec3,
    /// Spread input over several frames
    pub enable_damping: bool,
    /// Fraction of pending motion applied per update when damping
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pending azimuth change in radians
    delta_theta: f32,
    /// Pending polar change in radians
    delta_phi: f32,
    /// Pending distance multiplier
    scale: f32,
}

impl OrbitControls {
    /// Controls orbiting the origin, damping enabled
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    /// Rotate from a pointer drag of `delta` pixels on a viewport `height` pixels tall
    pub fn handle_drag(&mut self, delta: Vec2, height: f32) {
        let height = height.max(1.0);
        self.delta_theta -= TAU * delta.x / height * self.rotate_speed;
        self.delta_phi -= TAU * delta.y / height * self.rotate_speed;
    }

    /// Dolly from a scroll of `lines` (positive scrolls in)
    pub fn handle_scroll(&mut self, lines: f32) {
        if lines == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(self.zoom_speed * lines.abs());
        if lines > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Whether motion is still pending
    pub fn is_moving(&self) -> bool {
        self.delta_theta.abs() > 1e-6
            || self.delta_phi.abs() > 1e-6
            || (self.scale - 1.0).abs() > 1e-6
    }

    /// Move the camera by the pending motion; returns true if it moved
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return false;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let share = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * share;
        phi += self.delta_phi * share;
        phi = phi.clamp(POLE_EPSILON, PI - POLE_EPSILON);

        let new_radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            new_radius * sin_phi * theta.sin(),
            new_radius * phi.cos(),
            new_radius * sin_phi * theta.cos(),
        );

        camera.position = self.target + new_offset;
        camera.target = self.target;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        (new_offset - offset).length_squared() > 1e-12
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::perspective(75.0, 1.0, 0.1, 100.0, Vec3::new(0.25, 0.5, 5.0))
    }

    #[test]
    fn test_update_without_input_keeps_position() {
        let mut controls = OrbitControls::new();
        let mut camera = camera();
        let before = camera.position;

        controls.update(&mut camera);

        assert!((camera.position - before).length() < 1e-4);
    }

    #[test]
    fn test_damping_gives_inertia() {
        let mut controls = OrbitControls::new();
        let mut camera = camera();
        controls.handle_drag(Vec2::new(100.0, 0.0), 800.0);

        let start = camera.position;
        controls.update(&mut camera);
        let first_step = (camera.position - start).length();
        let mid = camera.position;
        controls.update(&mut camera);
        let second_step = (camera.position - mid).length();

        assert!(first_step > 0.0);
        assert!(second_step > 0.0);
        assert!(second_step < first_step);
        assert!(controls.is_moving());
    }

    #[test]
    fn test_undamped_applies_everything_at_once() {
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        let mut camera = camera();
        let radius = camera.position.length();

        controls.handle_drag(Vec2::new(50.0, 20.0), 600.0);
        assert!(controls.update(&mut camera));
        assert!(!controls.is_moving());
        assert!((camera.position.length() - radius).abs() < 1e-4);
    }

    #[test]
    fn test_scroll_dollies_in() {
        let mut controls = OrbitControls::new();
        let mut camera = camera();
        let radius = camera.position.length();

        controls.handle_scroll(1.0);
        controls.update(&mut camera);

        assert!((camera.position.length() - radius * 0.95).abs() < 1e-4);
    }
}
