use image::RgbaImage;

use super::frame::{CanvasSize, Color, Point};
use super::raster;

/// Wash blended over the trail every frame, fading older sweeps.
pub const TRAIL_WASH: Color = Color::argb(40, 10, 25, 50);

/// Persistent layer holding the fading afterimage of the sweep line.
pub struct TrailBuffer {
    image: RgbaImage,
}

impl Default for TrailBuffer {
    fn default() -> Self {
        Self {
            image: RgbaImage::new(1, 1),
        }
    }
}

impl TrailBuffer {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Recreates the buffer when the canvas changed size; the old trail
    /// is dropped.
    pub fn ensure_size(&mut self, size: CanvasSize) {
        if self.image.dimensions() != (size.width, size.height) {
            self.image = RgbaImage::new(size.width, size.height);
        }
    }

    pub fn fade(&mut self, wash: Color) {
        raster::fill(&mut self.image, wash);
    }

    pub fn stroke(&mut self, from: Point, to: Point, width: f32, color: Color) {
        raster::draw_line(&mut self.image, from, to, width, color);
    }
}
