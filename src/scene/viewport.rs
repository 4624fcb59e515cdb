//! Window dimensions and render resolution

/// Device pixel ratios above this are not rendered at full resolution
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Logical window size plus the pixel ratio used for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in logical pixels
    pub width: u32,
    /// Height in logical pixels
    pub height: u32,
    /// Render pixels per logical pixel, capped at [`MAX_PIXEL_RATIO`]
    pub pixel_ratio: f32,
}

impl Viewport {
    /// Create a viewport from a logical size and the display scale factor
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio: (scale_factor as f32).clamp(f32::MIN_POSITIVE, MAX_PIXEL_RATIO),
        }
    }

    /// Create a viewport from a window's physical size
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = scale_factor.max(f64::MIN_POSITIVE);
        Self::new(
            (f64::from(width) / scale).round() as u32,
            (f64::from(height) / scale).round() as u32,
            scale_factor,
        )
    }

    /// Width over height
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Size of the offscreen buffers the scene is rendered into
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scaled = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scaled(self.width), scaled(self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_is_capped() {
        let viewport = Viewport::from_physical(3000, 1500, 3.0);
        assert_eq!((viewport.width, viewport.height), (1000, 500));
        assert_eq!(viewport.pixel_ratio, 2.0);
        assert_eq!(viewport.drawing_buffer_size(), (2000, 1000));
    }

    #[test]
    fn test_low_density_display() {
        let viewport = Viewport::new(1280, 720, 1.0);
        assert_eq!(viewport.drawing_buffer_size(), (1280, 720));
        assert!((viewport.aspect() - 16.0 / 9.0).abs() < 1e-6);
    }
}
